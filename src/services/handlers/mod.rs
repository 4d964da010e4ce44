//! Event handlers, one per contract kind.
//!
//! A handler turns a decoded log into a closed enum of typed events and runs
//! one transition per variant. Handlers never touch storage directly: every
//! change is a [`Delta`] handed to the [`BlockchainRepository`], which checks,
//! persists and publishes it.

mod charged_token;
mod delegable_to_lt;
mod directory;
mod interface_project_token;

pub use charged_token::ChargedTokenHandler;
pub use delegable_to_lt::DelegableToLTHandler;
pub use directory::DirectoryHandler;
pub use interface_project_token::InterfaceProjectTokenHandler;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::{
	models::{
		add_amounts, format_address, sub_amounts, ContractKind, ContractSnapshot, Delta,
		StateError, UserBalance,
	},
	repositories::Session,
	services::{
		blockchain::contracts::DecodedLog,
		indexer::{BlockchainRepository, IndexerError},
	},
};

/// Applies the events of one contract instance
#[async_trait]
pub trait EventHandler: Send + Sync {
	fn kind(&self) -> ContractKind;

	fn chain_id(&self) -> u64;

	fn address(&self) -> Address;

	async fn on_event(
		&self,
		repository: &BlockchainRepository,
		session: Option<&Session>,
		log: &DecodedLog,
		block_number: u64,
	) -> Result<(), IndexerError>;
}

/// Builds the handler of a contract
pub fn create_handler(kind: ContractKind, chain_id: u64, address: Address) -> Arc<dyn EventHandler> {
	match kind {
		ContractKind::Directory => Arc::new(DirectoryHandler::new(chain_id, address)),
		ContractKind::ChargedToken => Arc::new(ChargedTokenHandler::new(chain_id, address)),
		ContractKind::InterfaceProjectToken => {
			Arc::new(InterfaceProjectTokenHandler::new(chain_id, address))
		}
		ContractKind::DelegableToLT => Arc::new(DelegableToLTHandler::new(chain_id, address)),
	}
}

/// Error for an event name a handler does not know
fn unknown_event(kind: ContractKind, address: Address, name: &str) -> IndexerError {
	IndexerError::handler_error(
		format!("Unhandled {} event {}", kind, name),
		None,
		Some(HashMap::from([
			("contract".to_string(), format_address(&address)),
			("event".to_string(), name.to_string()),
		])),
	)
}

/// How a field moves
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
	Increase(String),
	Decrease(String),
	Set(Value),
}

/// Builds the delta of `changes` against the current document. Changes of
/// the same field accumulate in order.
fn resolve_changes(document: &Value, changes: Vec<(&str, Change)>) -> Result<Delta, StateError> {
	let mut delta = Delta::new();
	for (field, change) in changes {
		let current = delta
			.get_str(field)
			.or_else(|| document.get(field).and_then(Value::as_str))
			.unwrap_or("0")
			.to_string();
		match change {
			Change::Increase(value) => delta.set(field, add_amounts(&current, &value)?),
			Change::Decrease(value) => delta.set(field, sub_amounts(&current, &value)?),
			Change::Set(value) => delta.set(field, value),
		}
	}
	Ok(delta)
}

/// Everything a transition needs besides its arguments
pub struct EventContext<'a> {
	pub repository: &'a BlockchainRepository,
	pub session: Option<&'a Session>,
	pub block_number: u64,
	pub event: &'a str,
}

impl<'a> EventContext<'a> {
	pub fn new(
		repository: &'a BlockchainRepository,
		session: Option<&'a Session>,
		block_number: u64,
		event: &'a str,
	) -> Self {
		Self {
			repository,
			session,
			block_number,
			event,
		}
	}

	pub async fn state(
		&self,
		kind: ContractKind,
		address: Address,
	) -> Result<ContractSnapshot, IndexerError> {
		self.repository
			.require_state(kind, address, self.session)
			.await
	}

	/// Overwrites fields of a snapshot
	pub async fn overwrite(
		&self,
		kind: ContractKind,
		address: Address,
		delta: Delta,
	) -> Result<ContractSnapshot, IndexerError> {
		self.repository
			.apply_update_and_notify(
				kind,
				address,
				delta,
				self.block_number,
				Some(self.event),
				self.session,
			)
			.await
	}

	/// Applies amount changes relative to the stored snapshot
	pub async fn update(
		&self,
		kind: ContractKind,
		address: Address,
		changes: Vec<(&str, Change)>,
	) -> Result<ContractSnapshot, IndexerError> {
		let document = self.state(kind, address).await?.to_document()?;
		let delta = resolve_changes(&document, changes)?;
		self.overwrite(kind, address, delta).await
	}

	/// Applies changes to the cached balance of `user` on the ChargedToken
	/// `address`. Balances are cached lazily: a missing row is left alone.
	pub async fn update_cached_balance(
		&self,
		address: Address,
		user: Address,
		changes: Vec<(&str, Change)>,
		pt_address: Option<Address>,
	) -> Result<Option<UserBalance>, IndexerError> {
		let Some(balance) = self
			.repository
			.get_balance(address, user, self.session)
			.await?
		else {
			debug!(
				contract = %format_address(&address),
				user = %format_address(&user),
				event = self.event,
				"No cached balance, skipping"
			);
			return Ok(None);
		};

		let document = serde_json::to_value(&balance).map_err(StateError::from)?;
		let delta = resolve_changes(&document, changes)?;
		self.repository
			.update_balance_and_notify(
				address,
				user,
				delta,
				self.block_number,
				pt_address,
				Some(self.event),
				self.session,
			)
			.await
			.map(Some)
	}
}
