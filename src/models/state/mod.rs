//! Mirrored contract state.
//!
//! Snapshots are stored as camelCase JSON documents, one collection per
//! contract kind. Amounts are decimal strings. All writes go through a
//! [`Delta`] which is checked against the kind's numeric fields before it is
//! merged.

mod amount;
mod balance;
mod charged_token;
mod delegable_to_lt;
mod delta;
mod directory;
mod error;
mod event;
mod interface_project_token;
mod kind;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use amount::{
	add_amounts, is_negative_amount, is_zero_amount, parse_amount, sub_amounts, Amount,
};
pub use balance::{UserBalance, BALANCE_NUMERIC_FIELDS};
pub use charged_token::{ChargedTokenSnapshot, FundraisingState};
pub use delegable_to_lt::DelegableToLTSnapshot;
pub use delta::{format_address, merge_document, Delta};
pub use directory::DirectorySnapshot;
pub use error::StateError;
pub use event::{EventKey, EventRecord, EventStatus};
pub use interface_project_token::InterfaceProjectTokenSnapshot;
pub use kind::ContractKind;

/// Snapshot of one contract, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ContractSnapshot {
	Directory(DirectorySnapshot),
	ChargedToken(ChargedTokenSnapshot),
	InterfaceProjectToken(InterfaceProjectTokenSnapshot),
	DelegableToLT(DelegableToLTSnapshot),
}

impl ContractSnapshot {
	/// Snapshot of `kind` with every field at its zero value
	pub fn empty(kind: ContractKind, chain_id: u64, address: Address) -> Self {
		match kind {
			ContractKind::Directory => Self::Directory(DirectorySnapshot::new(chain_id, address)),
			ContractKind::ChargedToken => {
				Self::ChargedToken(ChargedTokenSnapshot::new(chain_id, address))
			}
			ContractKind::InterfaceProjectToken => {
				Self::InterfaceProjectToken(InterfaceProjectTokenSnapshot::new(chain_id, address))
			}
			ContractKind::DelegableToLT => {
				Self::DelegableToLT(DelegableToLTSnapshot::new(chain_id, address))
			}
		}
	}

	pub fn kind(&self) -> ContractKind {
		match self {
			Self::Directory(_) => ContractKind::Directory,
			Self::ChargedToken(_) => ContractKind::ChargedToken,
			Self::InterfaceProjectToken(_) => ContractKind::InterfaceProjectToken,
			Self::DelegableToLT(_) => ContractKind::DelegableToLT,
		}
	}

	pub fn chain_id(&self) -> u64 {
		match self {
			Self::Directory(s) => s.chain_id,
			Self::ChargedToken(s) => s.chain_id,
			Self::InterfaceProjectToken(s) => s.chain_id,
			Self::DelegableToLT(s) => s.chain_id,
		}
	}

	pub fn address(&self) -> Address {
		match self {
			Self::Directory(s) => s.address,
			Self::ChargedToken(s) => s.address,
			Self::InterfaceProjectToken(s) => s.address,
			Self::DelegableToLT(s) => s.address,
		}
	}

	pub fn last_update_block(&self) -> u64 {
		match self {
			Self::Directory(s) => s.last_update_block,
			Self::ChargedToken(s) => s.last_update_block,
			Self::InterfaceProjectToken(s) => s.last_update_block,
			Self::DelegableToLT(s) => s.last_update_block,
		}
	}

	/// The untagged document, as stored and published
	pub fn to_document(&self) -> Result<Value, StateError> {
		let value = match self {
			Self::Directory(s) => serde_json::to_value(s)?,
			Self::ChargedToken(s) => serde_json::to_value(s)?,
			Self::InterfaceProjectToken(s) => serde_json::to_value(s)?,
			Self::DelegableToLT(s) => serde_json::to_value(s)?,
		};
		Ok(value)
	}

	pub fn from_document(kind: ContractKind, document: Value) -> Result<Self, StateError> {
		let snapshot = match kind {
			ContractKind::Directory => Self::Directory(serde_json::from_value(document)?),
			ContractKind::ChargedToken => Self::ChargedToken(serde_json::from_value(document)?),
			ContractKind::InterfaceProjectToken => {
				Self::InterfaceProjectToken(serde_json::from_value(document)?)
			}
			ContractKind::DelegableToLT => Self::DelegableToLT(serde_json::from_value(document)?),
		};
		Ok(snapshot)
	}

	/// Returns a copy with the delta applied
	pub fn merge(&self, delta: &Delta) -> Result<Self, StateError> {
		let merged = match self {
			Self::Directory(s) => Self::Directory(merge_document(s, delta)?),
			Self::ChargedToken(s) => Self::ChargedToken(merge_document(s, delta)?),
			Self::InterfaceProjectToken(s) => {
				Self::InterfaceProjectToken(merge_document(s, delta)?)
			}
			Self::DelegableToLT(s) => Self::DelegableToLT(merge_document(s, delta)?),
		};
		Ok(merged)
	}

	pub fn as_directory(&self) -> Option<&DirectorySnapshot> {
		match self {
			Self::Directory(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_charged_token(&self) -> Option<&ChargedTokenSnapshot> {
		match self {
			Self::ChargedToken(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_interface_project_token(&self) -> Option<&InterfaceProjectTokenSnapshot> {
		match self {
			Self::InterfaceProjectToken(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_delegable_to_lt(&self) -> Option<&DelegableToLTSnapshot> {
		match self {
			Self::DelegableToLT(s) => Some(s),
			_ => None,
		}
	}
}
