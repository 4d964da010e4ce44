//! Raw event log model.

use alloy::primitives::{Address, Bytes, LogData, B256, U64};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Position of a log within the chain, used to order events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogPosition {
	pub block_number: u64,
	pub tx_index: u64,
	pub log_index: u64,
}

/// An event log as returned by `eth_getLogs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLog {
	/// Emitting contract
	pub address: Address,
	/// Topics, the first one being the event selector
	pub topics: Vec<B256>,
	/// ABI encoded non-indexed arguments
	pub data: Bytes,
	#[serde(rename = "blockHash")]
	pub block_hash: Option<B256>,
	#[serde(rename = "blockNumber")]
	pub block_number: Option<U64>,
	#[serde(rename = "transactionHash")]
	pub transaction_hash: Option<B256>,
	#[serde(rename = "transactionIndex")]
	pub transaction_index: Option<U64>,
	#[serde(rename = "logIndex")]
	pub log_index: Option<U64>,
	#[serde(default)]
	pub removed: Option<bool>,
}

impl ChainLog {
	/// Event selector of the log, if any
	pub fn selector(&self) -> Option<&B256> {
		self.topics.first()
	}

	/// Position of the log, pending logs sort first
	pub fn position(&self) -> LogPosition {
		LogPosition {
			block_number: self.block_number.map(|n| n.to::<u64>()).unwrap_or_default(),
			tx_index: self.transaction_index.map(|n| n.to::<u64>()).unwrap_or_default(),
			log_index: self.log_index.map(|n| n.to::<u64>()).unwrap_or_default(),
		}
	}

	/// Whether the log carries the fields required to identify it in storage
	pub fn is_mined(&self) -> bool {
		self.block_number.is_some() && self.transaction_index.is_some() && self.log_index.is_some()
	}

	/// Topics and data in the shape expected by the ABI decoder
	pub fn log_data(&self) -> Option<LogData> {
		LogData::new(self.topics.clone(), self.data.clone())
	}

	/// Transaction hash as lowercase hex, empty when unknown
	pub fn transaction_hash_hex(&self) -> String {
		self.transaction_hash
			.map(|hash| format!("0x{:x}", hash))
			.unwrap_or_default()
	}
}

/// Sorts logs in chain order
pub fn sort_logs(logs: &mut [ChainLog]) {
	logs.sort_by(compare_logs);
}

fn compare_logs(a: &ChainLog, b: &ChainLog) -> Ordering {
	a.position().cmp(&b.position())
}
