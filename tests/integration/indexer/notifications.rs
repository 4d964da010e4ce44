//! Updates published by the indexing pipeline, observed through a mocked
//! notification broker.

use alloy::primitives::Address;
use serde_json::Value;
use std::sync::Arc;

use crate::integration::mocks::MockNotificationBroker;
use charged_token_indexer::{
	models::{
		format_address, ChargedTokenSnapshot, ContractKind, ContractSnapshot,
		DelegableToLTSnapshot, Delta, UserBalance,
	},
	repositories::{MemoryStateRepository, StateRepository},
	services::{indexer::BlockchainRepository, notification::UpdateTopic},
	utils::tests::builders::{
		chain::FakeChainClient,
		indexer::{address_arg, uint_arg},
		log::ChainLogBuilder,
		network::NetworkBuilder,
	},
};

const TOKEN: Address = Address::with_last_byte(0xc1);
const SECOND: Address = Address::with_last_byte(0xc2);
const THIRD: Address = Address::with_last_byte(0xc3);
const PROJECT_TOKEN: Address = Address::with_last_byte(0x91);
const ALICE: Address = Address::with_last_byte(0xa1);
const BOB: Address = Address::with_last_byte(0xb1);
const CHAIN_ID: u64 = 1;

struct Fixture {
	chain: Arc<FakeChainClient>,
	store: Arc<MemoryStateRepository>,
	repository: BlockchainRepository,
}

fn fixture(broker: MockNotificationBroker) -> Fixture {
	let chain = Arc::new(FakeChainClient::new());
	chain.set_head(50);
	let store = Arc::new(MemoryStateRepository::new());
	let repository = BlockchainRepository::new(
		NetworkBuilder::new().chain_id(CHAIN_ID).build(),
		chain.clone(),
		store.clone(),
		Arc::new(broker),
	);
	Fixture {
		chain,
		store,
		repository,
	}
}

fn balance_key(address: Address, user: Address) -> String {
	UserBalance::new(CHAIN_ID, address, user).notification_key()
}

fn field(payload: &Value, name: &str) -> String {
	payload[name].as_str().unwrap_or_default().to_string()
}

/// Stores a ChargedToken at block 5 and registers it from that state
async fn seed_token(fixture: &Fixture, address: Address) {
	let mut token = ChargedTokenSnapshot::new(CHAIN_ID, address);
	token.total_supply = "1000".to_string();
	token.last_update_block = 5;
	fixture
		.store
		.save(&ContractSnapshot::ChargedToken(token), None)
		.await
		.unwrap();
	fixture
		.repository
		.register_contract(ContractKind::ChargedToken, address, 5, None)
		.await
		.unwrap();
}

async fn seed_balance(fixture: &Fixture, address: Address, user: Address, balance: &str) {
	let mut row = UserBalance::new(CHAIN_ID, address, user);
	row.balance = balance.to_string();
	row.pt_address = PROJECT_TOKEN;
	fixture.store.save_balance(&row, None).await.unwrap();
}

#[tokio::test]
async fn test_fresh_registration_publishes_the_snapshot() {
	let mut broker = MockNotificationBroker::new();
	broker
		.expect_notify_update()
		.withf(|topic, chain_id, key, payload| {
			*topic == UpdateTopic::ChargedToken
				&& *chain_id == CHAIN_ID
				&& key == format_address(&TOKEN)
				&& payload["lastUpdateBlock"] == 50
		})
		.times(1)
		.return_const(());
	let fixture = fixture(broker);

	fixture
		.repository
		.register_contract(ContractKind::ChargedToken, TOKEN, 50, None)
		.await
		.unwrap();
}

#[tokio::test]
async fn test_balance_fan_out_publishes_every_row() {
	let mut broker = MockNotificationBroker::new();
	for address in [TOKEN, SECOND] {
		broker
			.expect_notify_update()
			.withf(move |topic, chain_id, key, payload| {
				*topic == UpdateTopic::UserBalance
					&& *chain_id == CHAIN_ID
					&& key == balance_key(address, ALICE)
					&& field(payload, "balancePT") == "25"
			})
			.times(1)
			.return_const(());
	}
	let fixture = fixture(broker);
	seed_balance(&fixture, TOKEN, ALICE, "10").await;
	seed_balance(&fixture, SECOND, ALICE, "20").await;

	let updated = fixture
		.repository
		.update_balance_and_notify(
			TOKEN,
			ALICE,
			Delta::new().with("balancePT", "25"),
			12,
			Some(PROJECT_TOKEN),
			Some("Transfer"),
			None,
		)
		.await
		.unwrap();

	assert_eq!(updated.balance_pt, "25");
	let second = fixture
		.store
		.get_balance(CHAIN_ID, SECOND, ALICE, None)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(second.balance_pt, "25");
	assert_eq!(second.balance, "20");
}

#[tokio::test]
async fn test_project_token_transfer_updates_every_mirroring_row() {
	let mut broker = MockNotificationBroker::new();
	for address in [TOKEN, SECOND, THIRD] {
		broker
			.expect_notify_update()
			.withf(move |topic, chain_id, key, payload| {
				*topic == UpdateTopic::UserBalance
					&& *chain_id == CHAIN_ID
					&& key == balance_key(address, ALICE)
					&& field(payload, "balancePT") == "125"
			})
			.times(1)
			.return_const(());
	}
	let fixture = fixture(broker);

	let mut project_token = DelegableToLTSnapshot::new(CHAIN_ID, PROJECT_TOKEN);
	project_token.total_supply = "1000".to_string();
	project_token.last_update_block = 5;
	fixture
		.store
		.save(&ContractSnapshot::DelegableToLT(project_token), None)
		.await
		.unwrap();
	fixture
		.repository
		.register_contract(ContractKind::DelegableToLT, PROJECT_TOKEN, 5, None)
		.await
		.unwrap();
	for address in [TOKEN, SECOND, THIRD] {
		let mut row = UserBalance::new(CHAIN_ID, address, ALICE);
		row.pt_address = PROJECT_TOKEN;
		row.balance_pt = "100".to_string();
		fixture.store.save_balance(&row, None).await.unwrap();
	}

	let entry = fixture
		.repository
		.graph()
		.get(&PROJECT_TOKEN)
		.await
		.unwrap();
	let log = ChainLogBuilder::new()
		.address(PROJECT_TOKEN)
		.position(6, 0, 0)
		.event(
			ContractKind::DelegableToLT,
			"Transfer",
			vec![address_arg(BOB), address_arg(ALICE), uint_arg(25)],
		)
		.build();

	fixture
		.repository
		.listener()
		.handle_log(&fixture.repository, &entry, &log, None)
		.await
		.unwrap();

	for address in [TOKEN, SECOND, THIRD] {
		let row = fixture
			.store
			.get_balance(CHAIN_ID, address, ALICE, None)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(row.balance_pt, "125");
		assert_eq!(row.last_update_block, 6);
	}
}

#[tokio::test]
async fn test_transfer_publishes_both_parties() {
	let mut broker = MockNotificationBroker::new();
	for (user, balance) in [(ALICE, "140"), (BOB, "70")] {
		broker
			.expect_notify_update()
			.withf(move |topic, _, key, payload| {
				*topic == UpdateTopic::UserBalance
					&& key == balance_key(TOKEN, user)
					&& field(payload, "balance") == balance
			})
			.times(1)
			.return_const(());
	}
	let fixture = fixture(broker);
	seed_token(&fixture, TOKEN).await;
	seed_balance(&fixture, TOKEN, ALICE, "150").await;
	seed_balance(&fixture, TOKEN, BOB, "60").await;

	let entry = fixture.repository.graph().get(&TOKEN).await.unwrap();
	let log = ChainLogBuilder::new()
		.address(TOKEN)
		.position(6, 0, 0)
		.event(
			ContractKind::ChargedToken,
			"Transfer",
			vec![address_arg(ALICE), address_arg(BOB), uint_arg(10)],
		)
		.build();

	fixture
		.repository
		.listener()
		.handle_log(&fixture.repository, &entry, &log, None)
		.await
		.unwrap();
}

#[tokio::test]
async fn test_rejected_update_publishes_nothing() {
	let mut broker = MockNotificationBroker::new();
	broker.expect_notify_update().times(0);
	let fixture = fixture(broker);
	seed_token(&fixture, TOKEN).await;
	seed_balance(&fixture, TOKEN, ALICE, "5").await;

	let entry = fixture.repository.graph().get(&TOKEN).await.unwrap();
	let log = ChainLogBuilder::new()
		.address(TOKEN)
		.position(6, 0, 0)
		.event(
			ContractKind::ChargedToken,
			"Transfer",
			vec![address_arg(ALICE), address_arg(BOB), uint_arg(10)],
		)
		.build();

	fixture
		.repository
		.listener()
		.handle_log(&fixture.repository, &entry, &log, None)
		.await
		.unwrap();

	assert_eq!(fixture.chain.call_count(), 0);
	let alice = fixture
		.store
		.get_balance(CHAIN_ID, TOKEN, ALICE, None)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(alice.balance, "5");
}
