//! Block-range polling of registered contracts.
//!
//! The loader trails the head by `blocks_lag` blocks and waits until at least
//! `blocks_buffer` blocks are available before fetching a range. A range is
//! applied in chain order; the checkpoint only moves once the whole range is
//! done, so a failed range is fetched again on the next head.
//!
//! Contracts registered while a range applies were not part of its log
//! query. Once the range is done, each of them replays its own logs from the
//! block after its registration up to the end of the range.

use alloy::primitives::Address;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	models::{format_address, sort_logs},
	services::indexer::{BlockchainRepository, IndexerError},
	utils::metrics::record_last_loaded_block,
};

/// Provider messages meaning the requested range is not available yet
const BLOCK_NOT_READY_MESSAGES: &[&str] = &[
	"header not found",
	"block not found",
	"after last accepted block",
	"beyond current head",
	"not processed yet",
	"unknown block",
];

/// Whether `error` says the node has not processed the requested blocks yet
pub fn is_block_not_ready_error(error: &IndexerError) -> bool {
	let text = error.chain_text().to_lowercase();
	BLOCK_NOT_READY_MESSAGES
		.iter()
		.any(|message| text.contains(message))
}

pub struct EventsLoader {
	repository: Arc<BlockchainRepository>,
	blocks_lag: u64,
	blocks_buffer: u64,
	last_loaded_block: u64,
}

impl EventsLoader {
	pub fn new(repository: Arc<BlockchainRepository>) -> Self {
		let network = repository.network();
		let blocks_lag = network.blocks_lag;
		let blocks_buffer = network.blocks_buffer.max(1);
		Self {
			repository,
			blocks_lag,
			blocks_buffer,
			last_loaded_block: 0,
		}
	}

	pub fn last_loaded_block(&self) -> u64 {
		self.last_loaded_block
	}

	/// Persists `from_block` as the checkpoint and starts counting from it
	pub async fn start(&mut self, from_block: u64) -> Result<(), IndexerError> {
		self.repository
			.store()
			.set_last_update_block(self.repository.chain_id(), from_block)
			.await?;
		self.last_loaded_block = from_block;
		record_last_loaded_block(&self.repository.network().slug, from_block);
		Ok(())
	}

	/// The range to load once the head reaches `head`, if it is due
	pub fn target_range(&self, head: u64) -> Option<(u64, u64)> {
		let to_block = head.checked_sub(self.blocks_lag)?;
		if to_block <= self.last_loaded_block {
			return None;
		}
		if to_block - self.last_loaded_block + 1 < self.blocks_buffer {
			return None;
		}
		Some((self.last_loaded_block + 1, to_block))
	}

	/// Loads the due range for a new head, returns it when one was loaded
	pub async fn on_new_block(&mut self, head: u64) -> Result<Option<(u64, u64)>, IndexerError> {
		let Some((from_block, to_block)) = self.target_range(head) else {
			debug!(head, last_loaded_block = self.last_loaded_block, "Waiting for more blocks");
			return Ok(None);
		};
		self.load_range(from_block, to_block).await?;
		Ok(Some((from_block, to_block)))
	}

	/// Applies the logs of every registered contract in `[from_block, to_block]`
	/// and advances the checkpoint to `to_block`
	#[instrument(skip(self), fields(network = %self.repository.network().slug))]
	pub async fn load_range(&mut self, from_block: u64, to_block: u64) -> Result<usize, IndexerError> {
		let repository = &self.repository;
		let graph = repository.graph();
		let addresses: Vec<Address> = graph.addresses().await;
		let queried: HashSet<Address> = addresses.iter().copied().collect();

		let mut logs = if addresses.is_empty() {
			Vec::new()
		} else {
			repository
				.client()
				.get_logs(from_block, to_block, Some(addresses))
				.await
				.map_err(|e| {
					IndexerError::chain_error(
						"Failed to load block range",
						Some(e.into()),
						Some(repository.range_metadata(from_block, to_block)),
					)
				})?
		};
		sort_logs(&mut logs);
		info!(from_block, to_block, logs = logs.len(), "Loaded block range");

		let mut applied = 0;
		for log in &logs {
			// Contracts may leave the graph while earlier logs of the range apply.
			let Some(entry) = graph.get(&log.address).await else {
				debug!(contract = %format_address(&log.address), "Dropping log of unregistered contract");
				continue;
			};
			if !entry.interface.knows(log) {
				continue;
			}
			repository
				.listener()
				.handle_log(repository, &entry, log, None)
				.await?;
			applied += 1;
		}
		applied += self.catch_up_registered(queried, to_block).await?;

		repository
			.store()
			.set_last_update_block(repository.chain_id(), to_block)
			.await?;
		self.last_loaded_block = to_block;
		record_last_loaded_block(&repository.network().slug, to_block);
		Ok(applied)
	}

	/// Replays up to `to_block` the logs of every contract missing from
	/// `queried`, until the catch-ups register nothing new
	async fn catch_up_registered(
		&self,
		mut queried: HashSet<Address>,
		to_block: u64,
	) -> Result<usize, IndexerError> {
		let repository = &self.repository;
		let graph = repository.graph();
		let mut applied = 0;
		loop {
			let added: Vec<Address> = graph
				.addresses()
				.await
				.into_iter()
				.filter(|address| !queried.contains(address))
				.collect();
			if added.is_empty() {
				return Ok(applied);
			}

			for address in added {
				queried.insert(address);
				// An earlier catch-up may have unregistered it again.
				let Some(entry) = graph.get(&address).await else {
					continue;
				};
				if entry.registered_at >= to_block {
					continue;
				}
				debug!(
					contract = %format_address(&address),
					from_block = entry.registered_at + 1,
					to_block,
					"Catching up contract registered during the range"
				);
				applied += repository
					.sync_events(address, entry.registered_at + 1, to_block, None)
					.await?;
			}
		}
	}

	/// Loads ranges as heads arrive until the head stream closes
	pub async fn run(mut self, mut heads: broadcast::Receiver<u64>) {
		loop {
			match heads.recv().await {
				Ok(head) => {
					if let Err(e) = self.on_new_block(head).await {
						self.report(&e);
					}
				}
				Err(RecvError::Lagged(missed)) => {
					warn!(
						network = %self.repository.network().slug,
						missed,
						"Events loader lagged behind the head stream"
					);
				}
				Err(RecvError::Closed) => break,
			}
		}
		info!(network = %self.repository.network().slug, "Events loader stopped");
	}

	fn report(&self, error: &IndexerError) {
		let network = &self.repository.network().slug;
		if is_block_not_ready_error(error) {
			warn!(
				network = %network,
				last_loaded_block = self.last_loaded_block,
				"Blocks not processed yet by the node, consider increasing blocks_lag: {}",
				error.chain_text()
			);
		} else {
			error!(
				network = %network,
				last_loaded_block = self.last_loaded_block,
				"Failed to load events: {}",
				error.chain_text()
			);
		}
	}
}
