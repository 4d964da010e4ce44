//! Mock implementation of the state repository.
//!
//! - [`MockStateRepository`] - used to inject storage failures under the
//!   indexing pipeline

use alloy::primitives::Address;
use async_trait::async_trait;
use mockall::mock;

use charged_token_indexer::{
	models::{
		ContractKind, ContractSnapshot, Delta, EventKey, EventRecord, EventStatus, UserBalance,
	},
	repositories::{RepositoryError, Session, StateRepository},
};

mock! {
	/// Mock implementation of the state repository.
	pub StateRepository {}

	#[async_trait]
	impl StateRepository for StateRepository {
		async fn start_session(&self) -> Result<Session, RepositoryError>;
		async fn commit_session(&self, session: Session) -> Result<(), RepositoryError>;
		async fn abort_session(&self, session: Session) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn exists(
			&self,
			kind: ContractKind,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<bool, RepositoryError>;
		#[mockall::concretize]
		async fn get(
			&self,
			kind: ContractKind,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<Option<ContractSnapshot>, RepositoryError>;
		#[mockall::concretize]
		async fn get_all(
			&self,
			kind: ContractKind,
			chain_id: u64,
			session: Option<&Session>,
		) -> Result<Vec<ContractSnapshot>, RepositoryError>;
		#[mockall::concretize]
		async fn save(
			&self,
			snapshot: &ContractSnapshot,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn update(
			&self,
			kind: ContractKind,
			chain_id: u64,
			address: Address,
			delta: &Delta,
			session: Option<&Session>,
		) -> Result<ContractSnapshot, RepositoryError>;
		#[mockall::concretize]
		async fn delete(
			&self,
			kind: ContractKind,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn is_delegable_still_referenced(
			&self,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<bool, RepositoryError>;
		#[mockall::concretize]
		async fn exists_balance(
			&self,
			chain_id: u64,
			address: Address,
			user: Address,
			session: Option<&Session>,
		) -> Result<bool, RepositoryError>;
		#[mockall::concretize]
		async fn get_balance(
			&self,
			chain_id: u64,
			address: Address,
			user: Address,
			session: Option<&Session>,
		) -> Result<Option<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn get_balances_by_contract(
			&self,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<Vec<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn get_balances_by_user(
			&self,
			chain_id: u64,
			user: Address,
			session: Option<&Session>,
		) -> Result<Vec<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn get_balances_by_project_token(
			&self,
			chain_id: u64,
			pt_address: Address,
			user: Address,
			session: Option<&Session>,
		) -> Result<Vec<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn save_balance(
			&self,
			balance: &UserBalance,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn update_balance(
			&self,
			chain_id: u64,
			address: Address,
			user: Address,
			delta: &Delta,
			session: Option<&Session>,
		) -> Result<UserBalance, RepositoryError>;
		#[mockall::concretize]
		async fn update_pt_balances(
			&self,
			chain_id: u64,
			address: Address,
			pt_address: Address,
			session: Option<&Session>,
		) -> Result<Vec<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn update_other_balances_by_project_token(
			&self,
			chain_id: u64,
			skip_address: Address,
			pt_address: Address,
			user: Address,
			delta: &Delta,
			session: Option<&Session>,
		) -> Result<Vec<UserBalance>, RepositoryError>;
		#[mockall::concretize]
		async fn delete_balances_by_contract(
			&self,
			chain_id: u64,
			address: Address,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn exists_event(
			&self,
			key: &EventKey,
			session: Option<&Session>,
		) -> Result<bool, RepositoryError>;
		#[mockall::concretize]
		async fn save_event(
			&self,
			record: &EventRecord,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		#[mockall::concretize]
		async fn update_event_status(
			&self,
			key: &EventKey,
			status: EventStatus,
			session: Option<&Session>,
		) -> Result<(), RepositoryError>;
		async fn get_events(
			&self,
			chain_id: u64,
			address: Address,
		) -> Result<Vec<EventRecord>, RepositoryError>;
		async fn get_last_update_block(&self, chain_id: u64) -> Result<Option<u64>, RepositoryError>;
		async fn set_last_update_block(&self, chain_id: u64, block: u64) -> Result<(), RepositoryError>;
	}
}
