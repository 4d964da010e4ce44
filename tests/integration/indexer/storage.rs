//! Storage failures under the indexing pipeline.
//!
//! The state repository is mocked so that single calls can fail, checking
//! which sessions are committed or aborted around them.

use alloy::primitives::Address;
use mockall::Sequence;
use std::sync::Arc;

use crate::integration::mocks::MockStateRepository;
use charged_token_indexer::{
	models::{ChainLog, ContractKind, ContractSnapshot, DirectorySnapshot, EventStatus},
	repositories::{RepositoryError, Session},
	services::{
		blockchain::contracts::ContractInterface,
		handlers::create_handler,
		indexer::{
			BlockchainRepository, EventOutcome, EventsLoader, IndexerError, RegisteredContract,
		},
		notification::BroadcastBroker,
	},
	utils::tests::builders::{
		chain::FakeChainClient,
		indexer::{address_arg, string_arg},
		log::ChainLogBuilder,
		network::NetworkBuilder,
	},
};

const DIRECTORY: Address = Address::with_last_byte(0xd1);
const TOKEN: Address = Address::with_last_byte(0xc1);
const OWNER: Address = Address::with_last_byte(0x0a);
const NEW_OWNER: Address = Address::with_last_byte(0x0b);
const CHAIN_ID: u64 = 1;

fn repository(chain: Arc<FakeChainClient>, store: MockStateRepository) -> Arc<BlockchainRepository> {
	Arc::new(BlockchainRepository::new(
		NetworkBuilder::new().chain_id(CHAIN_ID).build(),
		chain,
		Arc::new(store),
		Arc::new(BroadcastBroker::new(16)),
	))
}

fn chain_at(head: u64) -> Arc<FakeChainClient> {
	let chain = Arc::new(FakeChainClient::new());
	chain.set_head(head);
	chain
}

/// Graph entry inserted without touching the store
async fn register_directory(repository: &BlockchainRepository) -> RegisteredContract {
	let entry = RegisteredContract {
		kind: ContractKind::Directory,
		handler: create_handler(ContractKind::Directory, CHAIN_ID, DIRECTORY),
		interface: ContractInterface::new(ContractKind::Directory),
		handle: repository.handle(ContractKind::Directory, DIRECTORY),
		registered_at: 5,
	};
	repository.graph().insert(entry.clone(), None).await.unwrap();
	entry
}

fn directory_snapshot() -> ContractSnapshot {
	let mut directory = DirectorySnapshot::new(CHAIN_ID, DIRECTORY);
	directory.owner = OWNER;
	directory.last_update_block = 5;
	ContractSnapshot::Directory(directory)
}

fn ownership_log(block: u64) -> ChainLog {
	ChainLogBuilder::new()
		.address(DIRECTORY)
		.position(block, 0, 0)
		.event(
			ContractKind::Directory,
			"OwnershipTransferred",
			vec![address_arg(OWNER), address_arg(NEW_OWNER)],
		)
		.build()
}

fn whitelist_log(block: u64) -> ChainLog {
	ChainLogBuilder::new()
		.address(DIRECTORY)
		.position(block, 0, 0)
		.event(
			ContractKind::Directory,
			"ProjectOwnerWhitelisted",
			vec![address_arg(OWNER), string_arg("Alpha")],
		)
		.build()
}

#[tokio::test]
async fn test_event_record_failure_aborts_the_session() {
	let mut store = MockStateRepository::new();
	let session = Session::new();
	let session_id = session.id();

	store.expect_exists_event().returning(|_, _| Ok(false));
	store
		.expect_start_session()
		.times(1)
		.return_once(move || Ok(session));
	store.expect_save_event().times(1).returning(|_, _| {
		Err(RepositoryError::internal_error("disk full", None, None))
	});
	store
		.expect_abort_session()
		.withf(move |session| session.id() == session_id)
		.times(1)
		.returning(|_| Ok(()));
	store.expect_commit_session().times(0);

	let repository = repository(chain_at(10), store);
	let entry = register_directory(&repository).await;

	let result = repository
		.listener()
		.handle_log(&repository, &entry, &ownership_log(6), None)
		.await;

	match result {
		Err(IndexerError::StorageError(ctx)) => {
			assert!(ctx.message.contains("State repository failure"));
		}
		other => panic!("Expected a storage error, got {:?}", other.map(|_| ())),
	}
}

#[tokio::test]
async fn test_handler_failure_is_committed_in_a_fresh_session() {
	let mut store = MockStateRepository::new();
	let mut sequence = Sequence::new();
	let first = Session::new();
	let first_id = first.id();
	let second = Session::new();
	let second_id = second.id();

	store.expect_exists_event().returning(|_, _| Ok(false));
	store
		.expect_start_session()
		.times(1)
		.in_sequence(&mut sequence)
		.return_once(move || Ok(first));
	store
		.expect_save_event()
		.withf(|record, _| record.status == EventStatus::Queued)
		.times(1)
		.in_sequence(&mut sequence)
		.returning(|_, _| Ok(()));
	// The Directory snapshot is missing, so the handler fails
	store
		.expect_get()
		.times(1)
		.in_sequence(&mut sequence)
		.returning(|_, _, _, _| Ok(None));
	store
		.expect_abort_session()
		.withf(move |session| session.id() == first_id)
		.times(1)
		.in_sequence(&mut sequence)
		.returning(|_| Ok(()));
	store
		.expect_start_session()
		.times(1)
		.in_sequence(&mut sequence)
		.return_once(move || Ok(second));
	store
		.expect_save_event()
		.withf(|record, _| {
			record.status == EventStatus::Failure && record.name == "ProjectOwnerWhitelisted"
		})
		.times(1)
		.in_sequence(&mut sequence)
		.returning(|_, _| Ok(()));
	store
		.expect_commit_session()
		.withf(move |session| session.id() == second_id)
		.times(1)
		.in_sequence(&mut sequence)
		.returning(|_| Ok(()));
	store.expect_update_event_status().times(0);

	let repository = repository(chain_at(10), store);
	let entry = register_directory(&repository).await;

	let outcome = repository
		.listener()
		.handle_log(&repository, &entry, &whitelist_log(6), None)
		.await
		.unwrap();

	assert_eq!(outcome, EventOutcome::Failed);
}

#[tokio::test]
async fn test_commit_failure_propagates() {
	let mut store = MockStateRepository::new();

	store.expect_exists_event().returning(|_, _| Ok(false));
	store
		.expect_start_session()
		.returning(|| Ok(Session::new()));
	store.expect_save_event().returning(|_, _| Ok(()));
	store
		.expect_get()
		.returning(|_, _, _, _| Ok(Some(directory_snapshot())));
	store
		.expect_update()
		.times(1)
		.returning(|_, _, _, _, _| Ok(directory_snapshot()));
	store
		.expect_update_event_status()
		.withf(|_, status, _| *status == EventStatus::Success)
		.times(1)
		.returning(|_, _, _| Ok(()));
	store.expect_commit_session().times(1).returning(|_| {
		Err(RepositoryError::session_error("session expired", None, None))
	});

	let repository = repository(chain_at(10), store);
	let entry = register_directory(&repository).await;

	let result = repository
		.listener()
		.handle_log(&repository, &entry, &ownership_log(6), None)
		.await;

	assert!(matches!(result, Err(IndexerError::StorageError(_))));
}

#[tokio::test]
async fn test_failed_range_does_not_move_the_checkpoint() {
	let mut store = MockStateRepository::new();

	store
		.expect_set_last_update_block()
		.withf(|chain_id, block| *chain_id == CHAIN_ID && *block == 100)
		.times(1)
		.returning(|_, _| Ok(()));
	store
		.expect_set_last_update_block()
		.withf(|_, block| *block != 100)
		.times(0);
	store.expect_exists_event().returning(|_, _| {
		Err(RepositoryError::internal_error("connection reset", None, None))
	});

	let chain = chain_at(110);
	chain.push_log(ownership_log(102));
	let repository = repository(chain, store);
	register_directory(&repository).await;

	let mut loader = EventsLoader::new(repository.clone());
	loader.start(100).await.unwrap();
	let result = loader.load_range(101, 105).await;

	assert!(matches!(result, Err(IndexerError::StorageError(_))));
	assert_eq!(loader.last_loaded_block(), 100);
}

#[tokio::test]
async fn test_unstored_registration_leaves_the_graph_untouched() {
	let mut store = MockStateRepository::new();

	store.expect_get().returning(|_, _, _, _| Ok(None));
	store.expect_save().times(1).returning(|_, _| {
		Err(RepositoryError::internal_error("disk full", None, None))
	});

	let repository = repository(chain_at(50), store);
	let result = repository
		.register_contract(ContractKind::ChargedToken, TOKEN, 50, None)
		.await;

	assert!(matches!(result, Err(IndexerError::StorageError(_))));
	assert!(!repository.is_contract_registered(TOKEN).await);
}
