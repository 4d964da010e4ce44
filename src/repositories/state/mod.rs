//! Persistent store of the mirrored state.
//!
//! Holds contract snapshots (one collection per kind), per-user balances,
//! the event log and the loader checkpoint of every chain. Writes may be
//! grouped in a [`Session`]: they stay invisible to other readers until the
//! session is committed and are discarded when it is aborted. Every method
//! taking a session reads through it, so a session sees its own writes.

mod memory;

pub use memory::MemoryStateRepository;

use alloy::primitives::Address;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
	models::{
		ContractKind, ContractSnapshot, Delta, EventKey, EventRecord, EventStatus, UserBalance,
	},
	repositories::RepositoryError,
};

/// A unit of atomic writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	id: Uuid,
}

impl Session {
	pub fn new() -> Self {
		Self { id: Uuid::new_v4() }
	}

	pub fn id(&self) -> Uuid {
		self.id
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
pub trait StateRepository: Send + Sync {
	async fn start_session(&self) -> Result<Session, RepositoryError>;

	async fn commit_session(&self, session: Session) -> Result<(), RepositoryError>;

	async fn abort_session(&self, session: Session) -> Result<(), RepositoryError>;

	async fn exists(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError>;

	async fn get(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<Option<ContractSnapshot>, RepositoryError>;

	async fn get_all(
		&self,
		kind: ContractKind,
		chain_id: u64,
		session: Option<&Session>,
	) -> Result<Vec<ContractSnapshot>, RepositoryError>;

	/// Inserts a snapshot; fails if one is already stored for its key
	async fn save(
		&self,
		snapshot: &ContractSnapshot,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	/// Merges `delta` into the stored snapshot and returns the result
	async fn update(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<ContractSnapshot, RepositoryError>;

	async fn delete(
		&self,
		kind: ContractKind,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	/// Whether an InterfaceProjectToken of the chain still points at the
	/// DelegableToLT `address`
	async fn is_delegable_still_referenced(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError>;

	async fn exists_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError>;

	async fn get_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Option<UserBalance>, RepositoryError>;

	async fn get_balances_by_contract(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError>;

	/// Every balance row of `user` on the chain
	async fn get_balances_by_user(
		&self,
		chain_id: u64,
		user: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError>;

	/// Rows of `user` whose ChargedToken mirrors the DelegableToLT `pt_address`
	async fn get_balances_by_project_token(
		&self,
		chain_id: u64,
		pt_address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError>;

	async fn save_balance(
		&self,
		balance: &UserBalance,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	async fn update_balance(
		&self,
		chain_id: u64,
		address: Address,
		user: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<UserBalance, RepositoryError>;

	/// Stamps `pt_address` on every balance row of the ChargedToken `address`
	async fn update_pt_balances(
		&self,
		chain_id: u64,
		address: Address,
		pt_address: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError>;

	/// Applies `delta` to the rows of `user` sharing `pt_address`, except the
	/// one of `skip_address`, and returns the updated rows
	async fn update_other_balances_by_project_token(
		&self,
		chain_id: u64,
		skip_address: Address,
		pt_address: Address,
		user: Address,
		delta: &Delta,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, RepositoryError>;

	async fn delete_balances_by_contract(
		&self,
		chain_id: u64,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	async fn exists_event(
		&self,
		key: &EventKey,
		session: Option<&Session>,
	) -> Result<bool, RepositoryError>;

	async fn save_event(
		&self,
		record: &EventRecord,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	async fn update_event_status(
		&self,
		key: &EventKey,
		status: EventStatus,
		session: Option<&Session>,
	) -> Result<(), RepositoryError>;

	/// Committed events of a contract in chain order
	async fn get_events(
		&self,
		chain_id: u64,
		address: Address,
	) -> Result<Vec<EventRecord>, RepositoryError>;

	/// Highest block fully processed by the events loader
	async fn get_last_update_block(&self, chain_id: u64) -> Result<Option<u64>, RepositoryError>;

	async fn set_last_update_block(&self, chain_id: u64, block: u64)
		-> Result<(), RepositoryError>;
}
