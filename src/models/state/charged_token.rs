//! ChargedToken snapshot.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Liquidity token with vesting and staking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargedTokenSnapshot {
	pub chain_id: u64,
	pub address: Address,
	pub last_update_block: u64,
	pub owner: Address,
	pub name: String,
	pub symbol: String,
	pub decimals: String,
	pub total_supply: String,
	pub fraction_initial_unlock_per_thousand: String,
	pub duration_cliff: String,
	pub duration_linear_vesting: String,
	pub max_initial_token_allocation: String,
	#[serde(rename = "maxWithdrawFeesPerThousandForLT")]
	pub max_withdraw_fees_per_thousand_for_lt: String,
	#[serde(rename = "maxClaimFeesPerThousandForPT")]
	pub max_claim_fees_per_thousand_for_pt: String,
	#[serde(rename = "maxStakingAPR")]
	pub max_staking_apr: String,
	pub max_staking_token_amount: String,
	pub staking_start_date: String,
	pub staking_duration: String,
	pub staking_date_last_checkpoint: String,
	pub campaign_staking_rewards: String,
	pub total_staking_rewards: String,
	pub are_user_functions_disabled: bool,
	pub is_interface_project_token_locked: bool,
	pub are_allocations_terminated: bool,
	#[serde(rename = "withdrawFeesPerThousandForLT")]
	pub withdraw_fees_per_thousand_for_lt: String,
	pub ratio_fees_to_reward_hodlers_per_thousand: String,
	pub current_reward_per_share_1e18: String,
	#[serde(rename = "stakedLT")]
	pub staked_lt: String,
	pub total_locked: String,
	pub total_token_allocated: String,
	/// `Address::ZERO` when no interface is attached
	pub interface_project_token: Address,
	pub fundraising: Option<FundraisingState>,
}

/// Extra state carried by fundraising-enabled tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraisingState {
	pub is_fundraising_active: bool,
	pub fundraising_token: Address,
	pub fundraising_token_symbol: String,
	pub price_token_per_1e18: String,
	pub fundraising_fees_per_thousand: String,
}

impl ChargedTokenSnapshot {
	pub fn new(chain_id: u64, address: Address) -> Self {
		let zero = || "0".to_string();
		Self {
			chain_id,
			address,
			last_update_block: 0,
			owner: Address::ZERO,
			name: String::new(),
			symbol: String::new(),
			decimals: "18".to_string(),
			total_supply: zero(),
			fraction_initial_unlock_per_thousand: zero(),
			duration_cliff: zero(),
			duration_linear_vesting: zero(),
			max_initial_token_allocation: zero(),
			max_withdraw_fees_per_thousand_for_lt: zero(),
			max_claim_fees_per_thousand_for_pt: zero(),
			max_staking_apr: zero(),
			max_staking_token_amount: zero(),
			staking_start_date: zero(),
			staking_duration: zero(),
			staking_date_last_checkpoint: zero(),
			campaign_staking_rewards: zero(),
			total_staking_rewards: zero(),
			are_user_functions_disabled: false,
			is_interface_project_token_locked: false,
			are_allocations_terminated: false,
			withdraw_fees_per_thousand_for_lt: zero(),
			ratio_fees_to_reward_hodlers_per_thousand: zero(),
			current_reward_per_share_1e18: zero(),
			staked_lt: zero(),
			total_locked: zero(),
			total_token_allocated: zero(),
			interface_project_token: Address::ZERO,
			fundraising: None,
		}
	}

	pub fn has_interface(&self) -> bool {
		self.interface_project_token != Address::ZERO
	}
}
