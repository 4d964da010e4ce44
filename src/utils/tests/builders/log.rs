//! Test helper utilities for event logs
//!
//! - `ChainLogBuilder`: Builder for creating test ChainLog instances, either
//!   raw or ABI encoded from a known event

use alloy::{
	dyn_abi::DynSolValue,
	primitives::{Address, Bytes, B256, U64},
};

use crate::{
	models::{ChainLog, ContractKind},
	services::blockchain::contracts::abi,
};

/// Builder for creating test ChainLog instances
pub struct ChainLogBuilder {
	address: Address,
	topics: Vec<B256>,
	data: Bytes,
	block_hash: Option<B256>,
	block_number: Option<u64>,
	transaction_hash: Option<B256>,
	transaction_index: Option<u64>,
	log_index: Option<u64>,
}

impl Default for ChainLogBuilder {
	fn default() -> Self {
		Self {
			address: Address::with_last_byte(0xc1),
			topics: Vec::new(),
			data: Bytes::new(),
			block_hash: None,
			block_number: Some(1),
			transaction_hash: Some(B256::with_last_byte(0x01)),
			transaction_index: Some(0),
			log_index: Some(0),
		}
	}
}

impl ChainLogBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn address(mut self, address: Address) -> Self {
		self.address = address;
		self
	}

	pub fn topics(mut self, topics: Vec<B256>) -> Self {
		self.topics = topics;
		self
	}

	pub fn data(mut self, data: Bytes) -> Self {
		self.data = data;
		self
	}

	pub fn tx_hash(mut self, hash: B256) -> Self {
		self.transaction_hash = Some(hash);
		self
	}

	pub fn block_hash(mut self, hash: B256) -> Self {
		self.block_hash = Some(hash);
		self
	}

	/// Places the log at `block`, transaction `tx_index`, position `log_index`
	pub fn position(mut self, block: u64, tx_index: u64, log_index: u64) -> Self {
		self.block_number = Some(block);
		self.transaction_index = Some(tx_index);
		self.log_index = Some(log_index);
		self
	}

	/// Drops the position fields, as for a log of a pending block
	pub fn pending(mut self) -> Self {
		self.block_number = None;
		self.transaction_index = None;
		self.log_index = None;
		self
	}

	/// Encodes `name` of `kind` with `values` given in declaration order.
	///
	/// Unknown events leave the topics and data untouched.
	pub fn event(mut self, kind: ContractKind, name: &str, values: Vec<DynSolValue>) -> Self {
		let Some(event) = abi(kind).event(name).and_then(|events| events.first()) else {
			return self;
		};

		let mut topics = vec![event.selector()];
		let mut body = Vec::new();
		for (input, value) in event.inputs.iter().zip(values) {
			if input.indexed {
				topics.push(value.as_word().unwrap_or_default());
			} else {
				body.push(value);
			}
		}

		self.topics = topics;
		self.data = DynSolValue::Tuple(body).abi_encode_params().into();
		self
	}

	pub fn build(self) -> ChainLog {
		ChainLog {
			address: self.address,
			topics: self.topics,
			data: self.data,
			block_hash: self.block_hash,
			block_number: self.block_number.map(U64::from),
			transaction_hash: self.transaction_hash,
			transaction_index: self.transaction_index.map(U64::from),
			log_index: self.log_index.map(U64::from),
			removed: Some(false),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::U256;

	#[test]
	fn test_event_topics() {
		let user = Address::with_last_byte(0x42);
		let log = ChainLogBuilder::new()
			.event(
				ContractKind::ChargedToken,
				"LTDeposited",
				vec![
					DynSolValue::Address(user),
					DynSolValue::Uint(U256::from(7), 256),
				],
			)
			.build();

		assert_eq!(log.topics.len(), 2);
		assert_eq!(log.topics[1], user.into_word());
		assert_eq!(log.data.len(), 32);
	}

	#[test]
	fn test_pending_log() {
		let log = ChainLogBuilder::new().pending().build();
		assert!(!log.is_mined());
	}
}
