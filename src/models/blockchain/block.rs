//! Block header model.

use alloy::primitives::{B256, U64};
use serde::{Deserialize, Serialize};

/// Subset of an EVM block header the indexer relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
	/// Block number
	#[serde(with = "hex_u64")]
	pub number: u64,
	/// Block hash
	pub hash: B256,
	/// Hash of the parent block
	#[serde(rename = "parentHash")]
	pub parent_hash: B256,
	/// Block timestamp in seconds since the epoch
	#[serde(with = "hex_u64")]
	pub timestamp: u64,
}

impl BlockHeader {
	/// Timestamp rendered as an RFC 3339 date, or the raw seconds when out of range
	pub fn date(&self) -> String {
		chrono::DateTime::from_timestamp(self.timestamp as i64, 0)
			.map(|date| date.to_rfc3339())
			.unwrap_or_else(|| self.timestamp.to_string())
	}
}

/// JSON-RPC quantities are hex encoded
mod hex_u64 {
	use super::U64;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{:x}", value))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
		let value = U64::deserialize(deserializer)?;
		Ok(value.to::<u64>())
	}
}
