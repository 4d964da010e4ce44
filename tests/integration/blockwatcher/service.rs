//! Head watcher tests over a mocked scheduler and chain client.
//!
//! Expectations on the scheduler constructor are global, so every test that
//! sets them holds the scheduler lock.
#![allow(clippy::await_holding_lock)]

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use charged_token_indexer::services::{
	blockchain::ChainClient,
	blockwatcher::{poll_head, BlockWatcherError, HeadWatcher},
};

use crate::integration::mocks::{
	accepting_scheduler, create_test_network, lock_scheduler, MockChainClient, MockJobScheduler,
};

fn idle_client() -> Arc<dyn ChainClient> {
	Arc::new(MockChainClient::new())
}

#[tokio::test]
async fn test_watcher_scheduler_init_failure() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect()
		.returning(|| Err("Failed to initialize scheduler".into()));

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let result = HeadWatcher::<MockJobScheduler>::new(network).await;

	assert!(matches!(
		result,
		Err(BlockWatcherError::SchedulerError(_))
	));
}

#[tokio::test]
async fn test_watcher_add_job_failure() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect().returning(|| {
		let mut scheduler = MockJobScheduler::default();
		scheduler
			.expect_add()
			.times(1)
			.returning(|_| Err("Failed to add job".into()));
		scheduler.expect_start().never();
		Ok(scheduler)
	});

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let mut watcher = HeadWatcher::<MockJobScheduler>::new(network).await.unwrap();
	let error = watcher.start(idle_client()).await.unwrap_err();

	assert!(matches!(error, BlockWatcherError::SchedulerError(_)));
	assert!(error.to_string().contains("Failed to add job"));
}

#[tokio::test]
async fn test_watcher_start_failure() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect().returning(|| {
		let mut scheduler = MockJobScheduler::default();
		scheduler.expect_add().returning(|_| Ok(()));
		scheduler
			.expect_start()
			.times(1)
			.returning(|| Err("Failed to start scheduler".into()));
		Ok(scheduler)
	});

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let mut watcher = HeadWatcher::<MockJobScheduler>::new(network).await.unwrap();
	let error = watcher.start(idle_client()).await.unwrap_err();

	assert!(matches!(error, BlockWatcherError::SchedulerError(_)));
}

#[tokio::test]
async fn test_watcher_shutdown_failure() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect().returning(|| {
		let mut scheduler = MockJobScheduler::default();
		scheduler
			.expect_shutdown()
			.times(1)
			.returning(|| Err("Failed to shutdown scheduler".into()));
		Ok(scheduler)
	});

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let mut watcher = HeadWatcher::<MockJobScheduler>::new(network).await.unwrap();
	let error = watcher.stop().await.unwrap_err();

	assert!(matches!(error, BlockWatcherError::SchedulerError(_)));
}

#[tokio::test]
async fn test_watcher_lifecycle() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect().returning(|| {
		let mut scheduler = MockJobScheduler::default();
		scheduler.expect_add().times(1).returning(|_| Ok(()));
		scheduler.expect_start().times(1).returning(|| Ok(()));
		scheduler.expect_shutdown().times(1).returning(|| Ok(()));
		Ok(scheduler)
	});

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let mut watcher = HeadWatcher::<MockJobScheduler>::new(network).await.unwrap();

	watcher.start(idle_client()).await.unwrap();
	assert_eq!(watcher.last_seen().await, None);
	watcher.stop().await.unwrap();
}

#[tokio::test]
async fn test_watcher_with_accepting_scheduler() {
	let _guard = lock_scheduler();
	let ctx = MockJobScheduler::new_context();
	ctx.expect().returning(|| Ok(accepting_scheduler()));

	let network = create_test_network("Sepolia", "sepolia");
	let mut watcher = HeadWatcher::<MockJobScheduler>::new(network).await.unwrap();
	let mut heads = watcher.subscribe();

	watcher.start(idle_client()).await.unwrap();
	watcher.stop().await.unwrap();

	// The scheduler never ran the job
	assert!(matches!(
		heads.try_recv(),
		Err(broadcast::error::TryRecvError::Empty)
	));
}

#[tokio::test]
async fn test_poll_head_network_failure() {
	let mut client = MockChainClient::new();
	client
		.expect_get_latest_block_number()
		.times(1)
		.returning(|| Err(anyhow::anyhow!("connection refused")));

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let last_seen = Mutex::new(Some(7));
	let (sender, mut heads) = broadcast::channel(8);

	let error = poll_head(&network, &client, &last_seen, &sender)
		.await
		.unwrap_err();

	assert!(matches!(error, BlockWatcherError::NetworkError(_)));
	assert!(!error.is_fatal());
	assert_eq!(*last_seen.lock().await, Some(7));
	assert!(heads.try_recv().is_err());
}

#[tokio::test]
async fn test_poll_head_publishes_the_gap() {
	let mut client = MockChainClient::new();
	let mut heads_on_chain = vec![12u64, 10u64];
	client
		.expect_get_latest_block_number()
		.times(2)
		.returning(move || Ok(heads_on_chain.pop().unwrap_or_default()));

	let network = create_test_network("Polygon Amoy", "polygon_amoy");
	let last_seen = Mutex::new(None);
	let (sender, mut heads) = broadcast::channel(8);

	assert_eq!(
		poll_head(&network, &client, &last_seen, &sender).await.unwrap(),
		vec![10]
	);
	assert_eq!(
		poll_head(&network, &client, &last_seen, &sender).await.unwrap(),
		vec![11, 12]
	);

	let mut received = Vec::new();
	while let Ok(height) = heads.try_recv() {
		received.push(height);
	}
	assert_eq!(received, vec![10, 11, 12]);
}
