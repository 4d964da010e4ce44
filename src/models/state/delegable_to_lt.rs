//! DelegableToLT (project token) snapshot.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegableToLTSnapshot {
	pub chain_id: u64,
	pub address: Address,
	pub last_update_block: u64,
	pub owner: Address,
	pub name: String,
	pub symbol: String,
	pub decimals: String,
	pub total_supply: String,
	pub validated_interface_project_token: Vec<Address>,
	pub is_list_of_interface_project_token_complete: bool,
}

impl DelegableToLTSnapshot {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self {
			chain_id,
			address,
			last_update_block: 0,
			owner: Address::ZERO,
			name: String::new(),
			symbol: String::new(),
			decimals: "18".to_string(),
			total_supply: "0".to_string(),
			validated_interface_project_token: Vec::new(),
			is_list_of_interface_project_token_complete: false,
		}
	}
}
