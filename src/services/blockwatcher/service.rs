//! Head watcher implementation.
//!
//! Polls the latest block number of a network on its cron schedule and
//! publishes every newly seen height, in ascending order, on a broadcast
//! channel. The events loader and the reorg detector subscribe to it.

use anyhow::Context;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{instrument, trace};

use crate::{
	models::Network,
	services::{blockchain::ChainClient, blockwatcher::error::BlockWatcherError},
	utils::constants::HEAD_CHANNEL_CAPACITY,
};

/// Trait for job scheduler
///
/// This trait is used to abstract the job scheduler implementation.
/// It is used to allow the head watcher to be used with different job scheduler
/// implementations.
#[async_trait::async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Implementation of the job scheduler trait for the JobScheduler struct
#[async_trait::async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map(|_| ()).map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map(|_| ()).map_err(Into::into)
	}
}

/// Head watcher of a single network
///
/// # Type Parameters
/// * `J` - Job scheduler implementation (must implement JobSchedulerTrait)
pub struct HeadWatcher<J>
where
	J: JobSchedulerTrait,
{
	pub network: Network,
	pub scheduler: J,
	sender: broadcast::Sender<u64>,
	last_seen: Arc<Mutex<Option<u64>>>,
}

impl<J> HeadWatcher<J>
where
	J: JobSchedulerTrait,
{
	/// Creates a watcher with its own scheduler; nothing is polled before
	/// [`HeadWatcher::start`]
	pub async fn new(network: Network) -> Result<Self, BlockWatcherError> {
		let scheduler = J::new().await.map_err(|e| {
			BlockWatcherError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(network_metadata(&network)),
			)
		})?;
		let (sender, _) = broadcast::channel(HEAD_CHANNEL_CAPACITY);
		Ok(Self {
			network,
			scheduler,
			sender,
			last_seen: Arc::new(Mutex::new(None)),
		})
	}

	/// New receiver of the head stream. Heads published before the call are
	/// not replayed.
	pub fn subscribe(&self) -> broadcast::Receiver<u64> {
		self.sender.subscribe()
	}

	/// Highest height published so far
	pub async fn last_seen(&self) -> Option<u64> {
		*self.last_seen.lock().await
	}

	/// Schedules the polling job and starts the scheduler
	pub async fn start(&mut self, client: Arc<dyn ChainClient>) -> Result<(), BlockWatcherError> {
		let network = self.network.clone();
		let sender = self.sender.clone();
		let last_seen = self.last_seen.clone();

		let job = Job::new_async(self.network.cron_schedule.as_str(), move |_uuid, _l| {
			let network = network.clone();
			let sender = sender.clone();
			let last_seen = last_seen.clone();
			let client = client.clone();
			Box::pin(async move {
				// Failures are logged when the error is built; the next tick retries.
				let _ = poll_head(&network, client.as_ref(), &last_seen, &sender).await;
			})
		})
		.with_context(|| "Failed to create job")?;

		self.scheduler.add(job).await.map_err(|e| {
			BlockWatcherError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(network_metadata(&self.network)),
			)
		})?;

		self.scheduler.start().await.map_err(|e| {
			BlockWatcherError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(network_metadata(&self.network)),
			)
		})?;

		tracing::info!("Started head watcher for network: {}", self.network.slug);
		Ok(())
	}

	/// Shuts the scheduler down; subscribers see the stream close once the
	/// watcher is dropped
	pub async fn stop(&mut self) -> Result<(), BlockWatcherError> {
		self.scheduler.shutdown().await.map_err(|e| {
			BlockWatcherError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(network_metadata(&self.network)),
			)
		})?;

		tracing::info!("Stopped head watcher for network: {}", self.network.slug);
		Ok(())
	}
}

fn network_metadata(network: &Network) -> HashMap<String, String> {
	HashMap::from([("network".to_string(), network.slug.clone())])
}

/// Reads the head once and publishes every height above the last one seen.
///
/// The first poll publishes the head alone. Returns the published heights.
#[instrument(skip_all, fields(network = network.slug))]
pub async fn poll_head(
	network: &Network,
	client: &dyn ChainClient,
	last_seen: &Mutex<Option<u64>>,
	sender: &broadcast::Sender<u64>,
) -> Result<Vec<u64>, BlockWatcherError> {
	let latest = client.get_latest_block_number().await.map_err(|e| {
		BlockWatcherError::network_error(
			"Failed to get latest block number",
			Some(e.into()),
			Some(network_metadata(network)),
		)
	})?;

	let mut last_seen = last_seen.lock().await;
	let heights: Vec<u64> = match *last_seen {
		None => vec![latest],
		Some(previous) if latest > previous => (previous + 1..=latest).collect(),
		Some(_) => Vec::new(),
	};

	for height in &heights {
		if sender.send(*height).is_err() {
			trace!(height, "No subscriber for head");
		}
	}
	if let Some(highest) = heights.last() {
		*last_seen = Some(*highest);
		tracing::debug!(head = highest, published = heights.len(), "Published new heads");
	}
	Ok(heights)
}
