//! InterfaceProjectToken snapshot.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Bridge between a ChargedToken and its project token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceProjectTokenSnapshot {
	pub chain_id: u64,
	pub address: Address,
	pub last_update_block: u64,
	pub owner: Address,
	/// The ChargedToken this interface belongs to
	pub liquidity_token: Address,
	/// The DelegableToLT, `Address::ZERO` when not set yet
	pub project_token: Address,
	pub date_launch: String,
	pub date_end_cliff: String,
	#[serde(rename = "claimFeesPerThousandForPT")]
	pub claim_fees_per_thousand_for_pt: String,
}

impl InterfaceProjectTokenSnapshot {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self {
			chain_id,
			address,
			last_update_block: 0,
			owner: Address::ZERO,
			liquidity_token: Address::ZERO,
			project_token: Address::ZERO,
			date_launch: "0".to_string(),
			date_end_cliff: "0".to_string(),
			claim_fees_per_thousand_for_pt: "0".to_string(),
		}
	}

	pub fn has_project_token(&self) -> bool {
		self.project_token != Address::ZERO
	}
}
