//! Directory snapshot.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root registry of ChargedTokens and whitelisted project owners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySnapshot {
	pub chain_id: u64,
	pub address: Address,
	pub last_update_block: u64,
	pub owner: Address,
	/// Registered ChargedToken addresses
	pub directory: Vec<Address>,
	pub whitelisted_project_owners: Vec<Address>,
	pub projects: Vec<String>,
	/// ChargedToken address -> project name
	#[serde(rename = "projectRelatedToLT")]
	pub project_related_to_lt: BTreeMap<String, String>,
	/// Project owner address -> project name
	pub whitelist: BTreeMap<String, String>,
	pub are_user_functions_disabled: bool,
}

impl DirectorySnapshot {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self {
			chain_id,
			address,
			last_update_block: 0,
			owner: Address::ZERO,
			directory: Vec::new(),
			whitelisted_project_owners: Vec::new(),
			projects: Vec::new(),
			project_related_to_lt: BTreeMap::new(),
			whitelist: BTreeMap::new(),
			are_user_functions_disabled: false,
		}
	}
}
