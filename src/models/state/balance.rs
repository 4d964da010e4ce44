//! Per-user balances, scoped to a ChargedToken.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Numeric fields of a balance row
pub const BALANCE_NUMERIC_FIELDS: &[&str] = &[
	"balance",
	"balancePT",
	"fullyChargedBalance",
	"partiallyChargedBalance",
	"dateOfPartiallyCharged",
	"claimedRewardPerShare1e18",
	"valueProjectTokenToFullRecharge",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
	pub chain_id: u64,
	/// The ChargedToken the row belongs to
	pub address: Address,
	pub user: Address,
	/// The DelegableToLT mirrored by `balance_pt`, `Address::ZERO` when none
	pub pt_address: Address,
	pub last_update_block: u64,
	pub balance: String,
	#[serde(rename = "balancePT")]
	pub balance_pt: String,
	pub fully_charged_balance: String,
	pub partially_charged_balance: String,
	pub date_of_partially_charged: String,
	pub claimed_reward_per_share_1e18: String,
	pub value_project_token_to_full_recharge: String,
}

impl UserBalance {
	pub fn new(chain_id: u64, address: Address, user: Address) -> Self {
		let zero = || "0".to_string();
		Self {
			chain_id,
			address,
			user,
			pt_address: Address::ZERO,
			last_update_block: 0,
			balance: zero(),
			balance_pt: zero(),
			fully_charged_balance: zero(),
			partially_charged_balance: zero(),
			date_of_partially_charged: zero(),
			claimed_reward_per_share_1e18: zero(),
			value_project_token_to_full_recharge: zero(),
		}
	}

	/// Key used when publishing the row
	pub fn notification_key(&self) -> String {
		format!("0x{:x}:0x{:x}", self.address, self.user)
	}
}
