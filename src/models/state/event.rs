//! Persisted event log entries.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::state::ContractKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
	Queued,
	Success,
	Failure,
}

impl fmt::Display for EventStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EventStatus::Queued => f.write_str("QUEUED"),
			EventStatus::Success => f.write_str("SUCCESS"),
			EventStatus::Failure => f.write_str("FAILURE"),
		}
	}
}

/// Identity of a log; the ordering follows the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
	pub chain_id: u64,
	pub address: Address,
	pub block_number: u64,
	pub tx_index: u64,
	pub log_index: u64,
}

impl fmt::Display for EventKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}:0x{:x}:{}:{}:{}",
			self.chain_id, self.address, self.block_number, self.tx_index, self.log_index
		)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
	#[serde(flatten)]
	pub key: EventKey,
	pub tx_hash: String,
	pub contract: ContractKind,
	pub name: String,
	pub topics: Vec<String>,
	/// Decoded arguments rendered as strings, in ABI order
	pub args: Vec<String>,
	pub block_date: String,
	pub status: EventStatus,
}
