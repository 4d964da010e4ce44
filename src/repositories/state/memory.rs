//! In-memory state repository with optional JSON persistence.
//!
//! Each table keeps its committed rows plus one overlay per open session.
//! Reads through a session see the overlay on top of the committed rows.
//! When a file is configured, the committed rows are written to it whenever
//! the checkpoint moves and on [`MemoryStateRepository::flush`]. Commits only
//! mark the state dirty, so the file always pairs a checkpoint with the rows
//! it covers; rows committed after the last checkpoint are indexed again from
//! it after a crash.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
	collections::{BTreeMap, HashMap, HashSet},
	path::{Path, PathBuf},
};
use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::{
	models::{
		format_address, merge_document, ContractKind, ContractSnapshot, Delta, EventKey,
		EventRecord, EventStatus, StateError, UserBalance,
	},
	repositories::{
		state::{Session, StateRepository},
		RepositoryError,
	},
};

type ContractKey = (ContractKind, u64, Address);
type BalanceKey = (u64, Address, Address);

struct Table<K, V> {
	committed: BTreeMap<K, V>,
	/// Per-session writes, `None` marking a deletion
	pending: HashMap<Uuid, BTreeMap<K, Option<V>>>,
}

impl<K, V> Default for Table<K, V> {
	fn default() -> Self {
		Self {
			committed: BTreeMap::new(),
			pending: HashMap::new(),
		}
	}
}

impl<K: Ord + Clone, V: Clone> Table<K, V> {
	fn get(&self, key: &K, session: Option<Uuid>) -> Option<V> {
		if let Some(entry) = session
			.and_then(|id| self.pending.get(&id))
			.and_then(|changes| changes.get(key))
		{
			return entry.clone();
		}
		self.committed.get(key).cloned()
	}

	fn scan<F>(&self, session: Option<Uuid>, predicate: F) -> Vec<V>
	where
		F: Fn(&K, &V) -> bool,
	{
		let mut view: BTreeMap<&K, &V> = self.committed.iter().collect();
		if let Some(changes) = session.and_then(|id| self.pending.get(&id)) {
			for (key, value) in changes {
				match value {
					Some(value) => {
						view.insert(key, value);
					}
					None => {
						view.remove(key);
					}
				}
			}
		}
		view.into_iter()
			.filter(|(key, value)| predicate(key, value))
			.map(|(_, value)| value.clone())
			.collect()
	}

	fn put(&mut self, key: K, value: Option<V>, session: Option<Uuid>) {
		match session {
			Some(id) => {
				self.pending.entry(id).or_default().insert(key, value);
			}
			None => Self::apply(&mut self.committed, key, value),
		}
	}

	fn apply(committed: &mut BTreeMap<K, V>, key: K, value: Option<V>) {
		match value {
			Some(value) => {
				committed.insert(key, value);
			}
			None => {
				committed.remove(&key);
			}
		}
	}

	fn commit(&mut self, id: Uuid) {
		if let Some(changes) = self.pending.remove(&id) {
			for (key, value) in changes {
				Self::apply(&mut self.committed, key, value);
			}
		}
	}

	fn abort(&mut self, id: Uuid) {
		self.pending.remove(&id);
	}
}

#[derive(Default)]
struct Inner {
	contracts: Table<ContractKey, ContractSnapshot>,
	balances: Table<BalanceKey, UserBalance>,
	events: Table<EventKey, EventRecord>,
	checkpoints: Table<u64, u64>,
	sessions: HashSet<Uuid>,
	/// Committed rows not written to the file yet
	dirty: bool,
}

impl Inner {
	fn mark_dirty(&mut self, session: Option<Uuid>) {
		if session.is_none() {
			self.dirty = true;
		}
	}

	fn session_id(&self, session: Option<&Session>) -> Result<Option<Uuid>, RepositoryError> {
		match session {
			None => Ok(None),
			Some(session) if self.sessions.contains(&session.id()) => Ok(Some(session.id())),
			Some(session) => Err(RepositoryError::session_error(
				"Unknown session",
				None,
				Some(HashMap::from([(
					"session".to_string(),
					session.id().to_string(),
				)])),
			)),
		}
	}

	fn to_persisted(&self) -> PersistedState {
		PersistedState {
			contracts: self.contracts.committed.values().cloned().collect(),
			balances: self.balances.committed.values().cloned().collect(),
			events: self.events.committed.values().cloned().collect(),
			checkpoints: self
				.checkpoints
				.committed
				.iter()
				.map(|(chain_id, block)| (*chain_id, *block))
				.collect(),
		}
	}

	fn from_persisted(state: PersistedState) -> Self {
		let mut inner = Inner::default();
		for snapshot in state.contracts {
			inner.contracts.committed.insert(
				(snapshot.kind(), snapshot.chain_id(), snapshot.address()),
				snapshot,
			);
		}
		for balance in state.balances {
			inner
				.balances
				.committed
				.insert((balance.chain_id, balance.address, balance.user), balance);
		}
		for event in state.events {
			inner.events.committed.insert(event.key, event);
		}
		inner.checkpoints.committed.extend(state.checkpoints);
		inner
	}
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
	contracts: Vec<ContractSnapshot>,
	balances: Vec<UserBalance>,
	events: Vec<EventRecord>,
	checkpoints: Vec<(u64, u64)>,
}

pub struct MemoryStateRepository {
	inner: RwLock<Inner>,
	path: Option<PathBuf>,
	/// Held from serialization to rename, so files are written in state order
	file: Mutex<()>,
}

impl Default for MemoryStateRepository {
	fn default() -> Self {
		Self::new()
	}
}

fn contract_metadata(kind: ContractKind, chain_id: u64, address: &Address) -> HashMap<String, String> {
	HashMap::from([
		("kind".to_string(), kind.to_string()),
		("chain_id".to_string(), chain_id.to_string()),
		("address".to_string(), format_address(address)),
	])
}

fn balance_metadata(chain_id: u64, address: &Address, user: &Address) -> HashMap<String, String> {
	HashMap::from([
		("chain_id".to_string(), chain_id.to_string()),
		("address".to_string(), format_address(address)),
		("user".to_string(), format_address(user)),
	])
}

fn merge_error(error: StateError, metadata: HashMap<String, String>) -> RepositoryError {
	RepositoryError::validation_error("Invalid update", Some(Box::new(error)), Some(metadata))
}

impl MemoryStateRepository {
	/// Repository without persistence
	pub fn new() -> Self {
		Self {
			inner: RwLock::new(Inner::default()),
			path: None,
			file: Mutex::new(()),
		}
	}

	/// Repository persisted to `path`, loading it if it exists
	pub async fn open(path: &Path) -> Result<Self, RepositoryError> {
		let metadata = || {
			Some(HashMap::from([(
				"path".to_string(),
				path.display().to_string(),
			)]))
		};

		let inner = if tokio::fs::try_exists(path).await.unwrap_or(false) {
			let content = tokio::fs::read(path).await.map_err(|e| {
				RepositoryError::load_error("Failed to read state file", Some(Box::new(e)), metadata())
			})?;
			let state: PersistedState = serde_json::from_slice(&content).map_err(|e| {
				RepositoryError::load_error("Failed to parse state file", Some(Box::new(e)), metadata())
			})?;
			Inner::from_persisted(state)
		} else {
			if let Some(parent) = path.parent() {
				tokio::fs::create_dir_all(parent).await.map_err(|e| {
					RepositoryError::load_error(
						"Failed to create state directory",
						Some(Box::new(e)),
						metadata(),
					)
				})?;
			}
			Inner::default()
		};

		tracing::info!(
			path = %path.display(),
			contracts = inner.contracts.committed.len(),
			balances = inner.balances.committed.len(),
			"State repository opened"
		);

		Ok(Self {
			inner: RwLock::new(inner),
			path: Some(path.to_path_buf()),
			file: Mutex::new(()),
		})
	}

	/// Writes the committed rows through a temporary file. The state lock is
	/// released once the rows are serialized.
	async fn persist(&self, mut inner: RwLockWriteGuard<'_, Inner>) -> Result<(), RepositoryError> {
		let Some(path) = &self.path else {
			inner.dirty = false;
			return Ok(());
		};
		let metadata = || {
			Some(HashMap::from([(
				"path".to_string(),
				path.display().to_string(),
			)]))
		};

		let content = serde_json::to_vec(&inner.to_persisted()).map_err(|e| {
			RepositoryError::internal_error("Failed to serialize state", Some(Box::new(e)), metadata())
		})?;
		inner.dirty = false;
		let file = self.file.lock().await;
		drop(inner);

		let tmp = path.with_extension("json.tmp");
		let written = match tokio::fs::write(&tmp, content).await {
			Ok(()) => tokio::fs::rename(&tmp, path).await.map_err(|e| {
				RepositoryError::internal_error(
					"Failed to replace state file",
					Some(Box::new(e)),
					metadata(),
				)
			}),
			Err(e) => Err(RepositoryError::internal_error(
				"Failed to write state file",
				Some(Box::new(e)),
				metadata(),
			)),
		};
		drop(file);

		if written.is_err() {
			self.inner.write().await.dirty = true;
		}
		written
	}

	/// Writes the committed rows if any changed since the last write
	pub async fn flush(&self) -> Result<(), RepositoryError> {
		let inner = self.inner.write().await;
		if !inner.dirty {
			return Ok(());
		}
		self.persist(inner).await
	}

	/// Whether committed rows are waiting for the next write
	pub async fn is_dirty(&self) -> bool {
		self.inner.read().await.dirty
	}

	/// Number of sessions neither committed nor aborted
	pub async fn open_sessions(&self) -> usize {
		self.inner.read().await.sessions.len()
	}
}

#[async_trait]
impl StateRepository for MemoryStateRepository {
	async fn start_session(&self) -> Result<Session, RepositoryError> {
		let session = Session::new();
		self.inner.write().await.sessions.insert(session.id());
		Ok(session)
	}

	async fn commit_session(&self, session: Session) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let id = inner.session_id(Some(&session))?.unwrap_or(session.id());
		inner.contracts.commit(id);
		inner.balances.commit(id);
		inner.events.commit(id);
		inner.checkpoints.commit(id);
		inner.sessions.remove(&id);
		inner.dirty = true;
		Ok(())
	}

	async fn abort_session(&self, session: Session) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let id = inner.session_id(Some(&session))?.unwrap_or(session.id());
		inner.contracts.abort(id);
		inner.balances.abort(id);
		inner.events.abort(id);
		inner.checkpoints.abort(id);
		inner.sessions.remove(&id);
		Ok(())
	}

	async fn exists(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError> {
		Ok(self.get(kind, chain_id, address, session).await?.is_some())
	}

	async fn get(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<Option<ContractSnapshot>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner.contracts.get(&(kind, chain_id, address), session))
	}

	async fn get_all(
		&self,
		kind: ContractKind,
		chain_id: u64,
		session: Option<&Session>,
	) -> Result<Vec<ContractSnapshot>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner
			.contracts
			.scan(session, |key, _| key.0 == kind && key.1 == chain_id))
	}

	async fn save(
		&self,
		snapshot: &ContractSnapshot,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let key = (snapshot.kind(), snapshot.chain_id(), snapshot.address());
		if inner.contracts.get(&key, session).is_some() {
			return Err(RepositoryError::already_exists(
				"Snapshot already stored",
				None,
				Some(contract_metadata(key.0, key.1, &key.2)),
			));
		}
		inner.contracts.put(key, Some(snapshot.clone()), session);
		inner.mark_dirty(session);
		Ok(())
	}

	async fn update(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<ContractSnapshot, RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let key = (kind, chain_id, address);
		let current = inner.contracts.get(&key, session).ok_or_else(|| {
			RepositoryError::not_found(
				"Snapshot not found",
				None,
				Some(contract_metadata(kind, chain_id, &address)),
			)
		})?;
		let updated = current
			.merge(delta)
			.map_err(|e| merge_error(e, contract_metadata(kind, chain_id, &address)))?;
		inner.contracts.put(key, Some(updated.clone()), session);
		inner.mark_dirty(session);
		Ok(updated)
	}

	async fn delete(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		inner.contracts.put((kind, chain_id, address), None, session);
		inner.mark_dirty(session);
		Ok(())
	}

	async fn is_delegable_still_referenced(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		let referencing = inner.contracts.scan(session, |key, snapshot| {
			key.0 == ContractKind::InterfaceProjectToken
				&& key.1 == chain_id
				&& snapshot
					.as_interface_project_token()
					.map(|ipt| ipt.project_token == address)
					.unwrap_or(false)
		});
		Ok(!referencing.is_empty())
	}

	async fn exists_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError> {
		Ok(self
			.get_balance(chain_id, address, user, session)
			.await?
			.is_some())
	}

	async fn get_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Option<UserBalance>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner.balances.get(&(chain_id, address, user), session))
	}

	async fn get_balances_by_contract(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner
			.balances
			.scan(session, |key, _| key.0 == chain_id && key.1 == address))
	}

	async fn get_balances_by_user(
		&self,
		chain_id: u64,
		user: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner
			.balances
			.scan(session, |key, _| key.0 == chain_id && key.2 == user))
	}

	async fn get_balances_by_project_token(
		&self,
		chain_id: u64,
		pt_address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner.balances.scan(session, |key, balance| {
			key.0 == chain_id && key.2 == user && balance.pt_address == pt_address
		}))
	}

	async fn save_balance(
		&self,
		balance: &UserBalance,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let key = (balance.chain_id, balance.address, balance.user);
		if inner.balances.get(&key, session).is_some() {
			return Err(RepositoryError::already_exists(
				"Balance already stored",
				None,
				Some(balance_metadata(key.0, &key.1, &key.2)),
			));
		}
		inner.balances.put(key, Some(balance.clone()), session);
		inner.mark_dirty(session);
		Ok(())
	}

	async fn update_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<UserBalance, RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let key = (chain_id, address, user);
		let current = inner.balances.get(&key, session).ok_or_else(|| {
			RepositoryError::not_found(
				"Balance not found",
				None,
				Some(balance_metadata(chain_id, &address, &user)),
			)
		})?;
		let updated = merge_document(&current, delta)
			.map_err(|e| merge_error(e, balance_metadata(chain_id, &address, &user)))?;
		inner.balances.put(key, Some(updated.clone()), session);
		inner.mark_dirty(session);
		Ok(updated)
	}

	async fn update_pt_balances(
		&self,
		chain_id: u64,
		address: Address,
		pt_address: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let rows = inner
			.balances
			.scan(session, |key, _| key.0 == chain_id && key.1 == address);

		let mut updated = Vec::with_capacity(rows.len());
		for mut row in rows {
			row.pt_address = pt_address;
			inner
				.balances
				.put((row.chain_id, row.address, row.user), Some(row.clone()), session);
			updated.push(row);
		}
		inner.mark_dirty(session);
		Ok(updated)
	}

	async fn update_other_balances_by_project_token(
		&self,
		chain_id: u64,
		skip_address: Address,
		pt_address: Address,
		user: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let rows = inner.balances.scan(session, |key, balance| {
			key.0 == chain_id
				&& key.1 != skip_address
				&& key.2 == user
				&& balance.pt_address == pt_address
		});

		let mut updated = Vec::with_capacity(rows.len());
		for row in rows {
			let merged = merge_document(&row, delta)
				.map_err(|e| merge_error(e, balance_metadata(chain_id, &row.address, &user)))?;
			inner.balances.put(
				(merged.chain_id, merged.address, merged.user),
				Some(merged.clone()),
				session,
			);
			updated.push(merged);
		}
		inner.mark_dirty(session);
		Ok(updated)
	}

	async fn delete_balances_by_contract(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let rows = inner
			.balances
			.scan(session, |key, _| key.0 == chain_id && key.1 == address);
		for row in rows {
			inner
				.balances
				.put((row.chain_id, row.address, row.user), None, session);
		}
		inner.mark_dirty(session);
		Ok(())
	}

	async fn exists_event(
		&self,
		key: &EventKey,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError> {
		let inner = self.inner.read().await;
		let session = inner.session_id(session)?;
		Ok(inner.events.get(key, session).is_some())
	}

	async fn save_event(
		&self,
		record: &EventRecord,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		if inner.events.get(&record.key, session).is_some() {
			return Err(RepositoryError::already_exists(
				"Event already stored",
				None,
				Some(HashMap::from([("event".to_string(), record.key.to_string())])),
			));
		}
		inner.events.put(record.key, Some(record.clone()), session);
		inner.mark_dirty(session);
		Ok(())
	}

	async fn update_event_status(
		&self,
		key: &EventKey,
		status: EventStatus,
		session: Option<&Session>,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		let session = inner.session_id(session)?;
		let mut record = inner.events.get(key, session).ok_or_else(|| {
			RepositoryError::not_found(
				"Event not found",
				None,
				Some(HashMap::from([("event".to_string(), key.to_string())])),
			)
		})?;
		record.status = status;
		inner.events.put(*key, Some(record), session);
		inner.mark_dirty(session);
		Ok(())
	}

	async fn get_events(
		&self,
		chain_id: u64,
		address: Address,
	) -> Result<Vec<EventRecord>, RepositoryError> {
		let inner = self.inner.read().await;
		Ok(inner
			.events
			.scan(None, |key, _| key.chain_id == chain_id && key.address == address))
	}

	async fn get_last_update_block(&self, chain_id: u64) -> Result<Option<u64>, RepositoryError> {
		Ok(self.inner.read().await.checkpoints.get(&chain_id, None))
	}

	async fn set_last_update_block(
		&self,
		chain_id: u64,
		block: u64,
	) -> Result<(), RepositoryError> {
		let mut inner = self.inner.write().await;
		inner.checkpoints.put(chain_id, Some(block), None);
		self.persist(inner).await
	}
}
