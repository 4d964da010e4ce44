//! In-memory registration graph.
//!
//! Flat address-keyed map of the contracts currently tracked, plus the number
//! of InterfaceProjectTokens seen pointing at each DelegableToLT. The graph is
//! rebuilt at start by walking the Directory; the reference counts only save
//! redundant registrations within one process lifetime, unregistration asks
//! the persisted InterfaceProjectTokens instead.
//!
//! Changes made under a session are journaled until the session ends. An
//! aborted session rolls them back, so the graph never tracks a contract
//! whose snapshot was never committed, nor drops one whose deletion was
//! discarded.

use alloy::primitives::Address;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::{
	models::{format_address, ContractKind},
	repositories::Session,
	services::{
		blockchain::contracts::{ContractHandle, ContractInterface},
		handlers::EventHandler,
		indexer::IndexerError,
	},
	utils::metrics::record_registered_contracts,
};

/// One tracked contract
#[derive(Clone)]
pub struct RegisteredContract {
	pub kind: ContractKind,
	pub handler: Arc<dyn EventHandler>,
	pub interface: ContractInterface,
	pub handle: ContractHandle,
	/// Block the tracked state was loaded or caught up to at registration
	pub registered_at: u64,
}

impl RegisteredContract {
	pub fn address(&self) -> Address {
		self.handle.address()
	}
}

/// Undo information of one change
enum GraphChange {
	Inserted(Address),
	Removed(RegisteredContract, usize),
	Referenced(Address),
	Released(Address),
}

pub struct RegistrationGraph {
	network: String,
	contracts: RwLock<HashMap<Address, RegisteredContract>>,
	references: RwLock<HashMap<Address, usize>>,
	journal: Mutex<HashMap<Uuid, Vec<GraphChange>>>,
}

impl RegistrationGraph {
	pub fn new(network: impl Into<String>) -> Self {
		Self {
			network: network.into(),
			contracts: RwLock::new(HashMap::new()),
			references: RwLock::new(HashMap::new()),
			journal: Mutex::new(HashMap::new()),
		}
	}

	async fn record(&self, session: Option<&Session>, change: GraphChange) {
		if let Some(session) = session {
			self.journal
				.lock()
				.await
				.entry(session.id())
				.or_default()
				.push(change);
		}
	}

	/// Keeps the changes made under a committed session
	pub async fn forget(&self, session_id: Uuid) {
		self.journal.lock().await.remove(&session_id);
	}

	/// Undoes the changes made under an aborted session, newest first.
	/// Returns the number of changes undone.
	pub async fn rollback(&self, session_id: Uuid) -> usize {
		let Some(changes) = self.journal.lock().await.remove(&session_id) else {
			return 0;
		};

		let mut contracts = self.contracts.write().await;
		let mut references = self.references.write().await;
		for change in changes.iter().rev() {
			match change {
				GraphChange::Inserted(address) => {
					contracts.remove(address);
				}
				GraphChange::Removed(entry, count) => {
					if *count > 0 {
						references.insert(entry.address(), *count);
					}
					contracts.insert(entry.address(), entry.clone());
				}
				GraphChange::Referenced(address) => {
					if let Some(count) = references.get_mut(address) {
						*count -= 1;
						if *count == 0 {
							references.remove(address);
						}
					}
				}
				GraphChange::Released(address) => {
					*references.entry(*address).or_insert(0) += 1;
				}
			}
		}
		for kind in ContractKind::ALL {
			self.record_metrics(&contracts, kind);
		}
		debug!(session = %session_id, changes = changes.len(), "Rolled back registration graph changes");
		changes.len()
	}

	/// Sessions with journaled changes
	pub async fn open_sessions(&self) -> usize {
		self.journal.lock().await.len()
	}

	pub async fn contains(&self, address: &Address) -> bool {
		self.contracts.read().await.contains_key(address)
	}

	pub async fn get(&self, address: &Address) -> Option<RegisteredContract> {
		self.contracts.read().await.get(address).cloned()
	}

	pub async fn kind_of(&self, address: &Address) -> Option<ContractKind> {
		self.contracts.read().await.get(address).map(|entry| entry.kind)
	}

	pub async fn has_directory(&self) -> bool {
		self.contracts
			.read()
			.await
			.values()
			.any(|entry| entry.kind == ContractKind::Directory)
	}

	/// Tracks a new contract. A known address or a second Directory is refused.
	pub async fn insert(
		&self,
		entry: RegisteredContract,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let mut contracts = self.contracts.write().await;
		let address = entry.address();
		let metadata = HashMap::from([
			("contract".to_string(), format_address(&address)),
			("kind".to_string(), entry.kind.to_string()),
		]);

		if let Some(existing) = contracts.get(&address) {
			return Err(IndexerError::registration_error(
				format!("Contract already registered as {}", existing.kind),
				None,
				Some(metadata),
			));
		}
		if entry.kind == ContractKind::Directory
			&& contracts
				.values()
				.any(|other| other.kind == ContractKind::Directory)
		{
			return Err(IndexerError::registration_error(
				"A Directory is already registered",
				None,
				Some(metadata),
			));
		}

		let kind = entry.kind;
		contracts.insert(address, entry);
		self.record_metrics(&contracts, kind);
		drop(contracts);
		self.record(session, GraphChange::Inserted(address)).await;
		Ok(())
	}

	pub async fn remove(
		&self,
		address: &Address,
		session: Option<&Session>,
	) -> Option<RegisteredContract> {
		let mut contracts = self.contracts.write().await;
		let removed = contracts.remove(address)?;
		self.record_metrics(&contracts, removed.kind);
		drop(contracts);

		let count = self.references.write().await.remove(address).unwrap_or(0);
		self.record(session, GraphChange::Removed(removed.clone(), count))
			.await;
		Some(removed)
	}

	/// Every tracked address, sorted
	pub async fn addresses(&self) -> Vec<Address> {
		let mut addresses: Vec<Address> = self.contracts.read().await.keys().copied().collect();
		addresses.sort();
		addresses
	}

	pub async fn addresses_of(&self, kind: ContractKind) -> Vec<Address> {
		let mut addresses: Vec<Address> = self
			.contracts
			.read()
			.await
			.values()
			.filter(|entry| entry.kind == kind)
			.map(RegisteredContract::address)
			.collect();
		addresses.sort();
		addresses
	}

	pub async fn len(&self) -> usize {
		self.contracts.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.contracts.read().await.is_empty()
	}

	/// Counts one more interface pointing at `address`, returns the new count
	pub async fn add_reference(&self, address: Address, session: Option<&Session>) -> usize {
		let count = {
			let mut references = self.references.write().await;
			let count = references.entry(address).or_insert(0);
			*count += 1;
			*count
		};
		self.record(session, GraphChange::Referenced(address)).await;
		count
	}

	/// Counts one interface less, returns the remaining count
	pub async fn release_reference(&self, address: &Address, session: Option<&Session>) -> usize {
		let remaining = {
			let mut references = self.references.write().await;
			match references.get_mut(address) {
				Some(count) if *count > 1 => {
					*count -= 1;
					Some(*count)
				}
				Some(_) => {
					references.remove(address);
					Some(0)
				}
				None => None,
			}
		};
		match remaining {
			Some(count) => {
				self.record(session, GraphChange::Released(*address)).await;
				count
			}
			None => 0,
		}
	}

	pub async fn references(&self, address: &Address) -> usize {
		self.references
			.read()
			.await
			.get(address)
			.copied()
			.unwrap_or(0)
	}

	fn record_metrics(&self, contracts: &HashMap<Address, RegisteredContract>, kind: ContractKind) {
		let count = contracts.values().filter(|entry| entry.kind == kind).count();
		record_registered_contracts(&self.network, kind, count);
	}
}
