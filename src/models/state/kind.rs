//! Contract kinds tracked by the indexer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four contract types of the registration graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractKind {
	Directory,
	ChargedToken,
	InterfaceProjectToken,
	DelegableToLT,
}

impl ContractKind {
	pub const ALL: [ContractKind; 4] = [
		ContractKind::Directory,
		ContractKind::ChargedToken,
		ContractKind::InterfaceProjectToken,
		ContractKind::DelegableToLT,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ContractKind::Directory => "Directory",
			ContractKind::ChargedToken => "ChargedToken",
			ContractKind::InterfaceProjectToken => "InterfaceProjectToken",
			ContractKind::DelegableToLT => "DelegableToLT",
		}
	}

	/// Snapshot fields holding amounts, which must never go negative
	pub fn numeric_fields(&self) -> &'static [&'static str] {
		match self {
			ContractKind::Directory => &[],
			ContractKind::ChargedToken => &[
				"totalSupply",
				"fractionInitialUnlockPerThousand",
				"durationCliff",
				"durationLinearVesting",
				"maxInitialTokenAllocation",
				"maxWithdrawFeesPerThousandForLT",
				"maxClaimFeesPerThousandForPT",
				"maxStakingAPR",
				"maxStakingTokenAmount",
				"stakingStartDate",
				"stakingDuration",
				"stakingDateLastCheckpoint",
				"campaignStakingRewards",
				"totalStakingRewards",
				"withdrawFeesPerThousandForLT",
				"ratioFeesToRewardHodlersPerThousand",
				"currentRewardPerShare1e18",
				"stakedLT",
				"totalLocked",
				"totalTokenAllocated",
			],
			ContractKind::InterfaceProjectToken => {
				&["dateLaunch", "dateEndCliff", "claimFeesPerThousandForPT"]
			}
			ContractKind::DelegableToLT => &["totalSupply"],
		}
	}
}

impl fmt::Display for ContractKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
