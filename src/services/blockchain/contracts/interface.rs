//! Log decoding against a contract kind's ABI.

use alloy::{
	dyn_abi::{DynSolValue, EventExt},
	json_abi::{Event, Function, JsonAbi},
	primitives::{Address, B256, U256},
};
use std::collections::HashMap;

use crate::{
	models::{ChainLog, ContractKind},
	services::{
		blockchain::contracts::abi::{abi, known_events},
		indexer::IndexerError,
	},
};

/// Decoded ABI surface of one contract kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInterface {
	kind: ContractKind,
}

impl ContractInterface {
	pub fn new(kind: ContractKind) -> Self {
		Self { kind }
	}

	pub fn kind(&self) -> ContractKind {
		self.kind
	}

	pub fn abi(&self) -> &'static JsonAbi {
		abi(self.kind)
	}

	/// Event definition for `selector`, if the kind declares it
	pub fn event(&self, selector: &B256) -> Option<&'static Event> {
		known_events(self.kind).get(selector)
	}

	/// Whether the log's first topic is a known event of this kind
	pub fn knows(&self, log: &ChainLog) -> bool {
		log.selector()
			.map(|selector| self.event(selector).is_some())
			.unwrap_or(false)
	}

	pub fn function(&self, name: &str) -> Result<&'static Function, IndexerError> {
		self.abi()
			.function(name)
			.and_then(|functions| functions.first())
			.ok_or_else(|| {
				IndexerError::decode_error(
					format!("{} has no function {}", self.kind, name),
					None,
					None,
				)
			})
	}

	/// Decodes `log` into its event name and arguments in declaration order.
	pub fn decode_log(&self, log: &ChainLog) -> Result<DecodedLog, IndexerError> {
		let metadata = || {
			HashMap::from([
				("contract".to_string(), format!("0x{:x}", log.address)),
				("kind".to_string(), self.kind.to_string()),
				("tx_hash".to_string(), log.transaction_hash_hex()),
			])
		};

		let event = log
			.selector()
			.and_then(|selector| self.event(selector))
			.ok_or_else(|| IndexerError::decode_error("Unknown topic", None, Some(metadata())))?;

		let data = log.log_data().ok_or_else(|| {
			IndexerError::decode_error("Too many topics", None, Some(metadata()))
		})?;

		let decoded = event.decode_log(&data).map_err(|e| {
			IndexerError::decode_error(
				format!("Failed to decode {}", event.name),
				Some(Box::new(e)),
				Some(metadata()),
			)
		})?;

		let mut indexed = decoded.indexed.into_iter();
		let mut body = decoded.body.into_iter();
		let mut args = Vec::with_capacity(event.inputs.len());
		for input in &event.inputs {
			let value = if input.indexed {
				indexed.next()
			} else {
				body.next()
			};
			let value = value.ok_or_else(|| {
				IndexerError::decode_error(
					format!("Missing argument {} of {}", input.name, event.name),
					None,
					Some(metadata()),
				)
			})?;
			args.push((input.name.clone(), value));
		}

		Ok(DecodedLog {
			name: event.name.clone(),
			args,
		})
	}
}

/// An event name with its decoded arguments
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
	pub name: String,
	pub args: Vec<(String, DynSolValue)>,
}

impl DecodedLog {
	pub fn new(name: impl Into<String>, args: Vec<(String, DynSolValue)>) -> Self {
		Self {
			name: name.into(),
			args,
		}
	}

	fn arg(&self, index: usize) -> Result<&DynSolValue, IndexerError> {
		self.args.get(index).map(|(_, value)| value).ok_or_else(|| {
			IndexerError::decode_error(
				format!("{} has no argument {}", self.name, index),
				None,
				None,
			)
		})
	}

	fn mismatch(&self, index: usize, expected: &str) -> IndexerError {
		IndexerError::decode_error(
			format!("Argument {} of {} is not {}", index, self.name, expected),
			None,
			None,
		)
	}

	pub fn address(&self, index: usize) -> Result<Address, IndexerError> {
		self.arg(index)?
			.as_address()
			.ok_or_else(|| self.mismatch(index, "an address"))
	}

	pub fn uint(&self, index: usize) -> Result<U256, IndexerError> {
		self.arg(index)?
			.as_uint()
			.map(|(value, _)| value)
			.ok_or_else(|| self.mismatch(index, "an unsigned integer"))
	}

	/// Unsigned argument as a decimal amount string
	pub fn amount(&self, index: usize) -> Result<String, IndexerError> {
		self.uint(index).map(|value| value.to_string())
	}

	pub fn boolean(&self, index: usize) -> Result<bool, IndexerError> {
		self.arg(index)?
			.as_bool()
			.ok_or_else(|| self.mismatch(index, "a boolean"))
	}

	pub fn string(&self, index: usize) -> Result<String, IndexerError> {
		self.arg(index)?
			.as_str()
			.map(str::to_string)
			.ok_or_else(|| self.mismatch(index, "a string"))
	}

	/// Arguments rendered for storage, in declaration order
	pub fn format_args(&self) -> Vec<String> {
		self.args.iter().map(|(_, value)| format_value(value)).collect()
	}
}

/// Renders a decoded value the way event records store it
pub fn format_value(value: &DynSolValue) -> String {
	match value {
		DynSolValue::Address(address) => format!("0x{:x}", address),
		DynSolValue::Bool(flag) => flag.to_string(),
		DynSolValue::Uint(number, _) => number.to_string(),
		DynSolValue::Int(number, _) => number.to_string(),
		DynSolValue::String(text) => text.clone(),
		DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
		DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
		DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
			format!(
				"[{}]",
				items.iter().map(format_value).collect::<Vec<_>>().join(",")
			)
		}
		other => format!("{:?}", other),
	}
}
