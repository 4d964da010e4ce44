//! Test helper utilities for the indexing pipeline
//!
//! - `TestIndexer`: a [`BlockchainRepository`] wired to a [`FakeChainClient`],
//!   an in-memory state repository and a subscribed broadcast broker
//! - `address_arg`, `uint_arg`, `bool_arg`, `string_arg`: event argument shorthands

use alloy::{
	dyn_abi::DynSolValue,
	primitives::{Address, U256},
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
	models::{ContractKind, ContractSnapshot, EventKey, EventRecord, Network, UserBalance},
	repositories::{MemoryStateRepository, StateRepository},
	services::{
		indexer::{BlockchainRepository, EventOutcome},
		notification::{BroadcastBroker, UpdateNotification},
	},
	utils::tests::builders::{
		chain::FakeChainClient, log::ChainLogBuilder, network::NetworkBuilder,
	},
};

pub fn address_arg(address: Address) -> DynSolValue {
	DynSolValue::Address(address)
}

pub fn uint_arg(value: u64) -> DynSolValue {
	DynSolValue::Uint(U256::from(value), 256)
}

pub fn bool_arg(value: bool) -> DynSolValue {
	DynSolValue::Bool(value)
}

pub fn string_arg(value: &str) -> DynSolValue {
	DynSolValue::String(value.to_string())
}

/// Indexer over fakes, for handler and pipeline tests
pub struct TestIndexer {
	pub chain: Arc<FakeChainClient>,
	pub store: Arc<MemoryStateRepository>,
	pub broker: Arc<BroadcastBroker>,
	pub repository: Arc<BlockchainRepository>,
	pub notifications: broadcast::Receiver<UpdateNotification>,
}

impl Default for TestIndexer {
	fn default() -> Self {
		Self::with_network(NetworkBuilder::new().build())
	}
}

impl TestIndexer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_network(network: Network) -> Self {
		let chain = Arc::new(FakeChainClient::new());
		let store = Arc::new(MemoryStateRepository::new());
		let broker = Arc::new(BroadcastBroker::new(1024));
		let notifications = broker.subscribe();
		let repository = Arc::new(BlockchainRepository::new(
			network,
			chain.clone(),
			store.clone(),
			broker.clone(),
		));
		Self {
			chain,
			store,
			broker,
			repository,
			notifications,
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.repository.chain_id()
	}

	/// Stores `snapshot` and registers its contract without any chain read
	pub async fn seed(&self, snapshot: ContractSnapshot) {
		let block = snapshot.last_update_block();
		if self.chain.head() < block {
			self.chain.set_head(block);
		}
		self.store.save(&snapshot, None).await.unwrap();
		self.repository
			.register_contract(snapshot.kind(), snapshot.address(), block, None)
			.await
			.unwrap();
	}

	pub async fn seed_balance(&self, balance: UserBalance) {
		self.store.save_balance(&balance, None).await.unwrap();
	}

	/// Encodes `name` on the registered contract `address` and runs it
	/// through the listener
	pub async fn apply(
		&self,
		address: Address,
		name: &str,
		values: Vec<DynSolValue>,
		position: (u64, u64, u64),
	) -> EventOutcome {
		let entry = self
			.repository
			.graph()
			.get(&address)
			.await
			.expect("contract is not registered");
		let (block, tx_index, log_index) = position;
		let log = ChainLogBuilder::new()
			.address(address)
			.position(block, tx_index, log_index)
			.event(entry.kind, name, values)
			.build();
		if self.chain.head() < block {
			self.chain.set_head(block);
		}
		self.repository
			.listener()
			.handle_log(&self.repository, &entry, &log, None)
			.await
			.unwrap()
	}

	pub async fn snapshot(&self, kind: ContractKind, address: Address) -> Option<ContractSnapshot> {
		self.store
			.get(kind, self.chain_id(), address, None)
			.await
			.unwrap()
	}

	pub async fn balance(&self, address: Address, user: Address) -> Option<UserBalance> {
		self.store
			.get_balance(self.chain_id(), address, user, None)
			.await
			.unwrap()
	}

	pub async fn events(&self, address: Address) -> Vec<EventRecord> {
		self.store.get_events(self.chain_id(), address).await.unwrap()
	}

	pub async fn event_exists(&self, key: &EventKey) -> bool {
		self.store.exists_event(key, None).await.unwrap()
	}

	/// Notifications published since the last drain
	pub fn drain_notifications(&mut self) -> Vec<UpdateNotification> {
		let mut notifications = Vec::new();
		while let Ok(notification) = self.notifications.try_recv() {
			notifications.push(notification);
		}
		notifications
	}
}
