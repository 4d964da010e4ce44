//! Chain reorganization detection.
//!
//! The detector keeps the last `reorg_history_size` headers it has seen,
//! indexed by number and by hash. A new head whose hash differs from the one
//! recorded at its height, or whose parent is not the recorded previous
//! block, means the chain was rewritten. The detector then walks parent links
//! back to a known block to locate the fork point.
//!
//! Reorganizations are only reported. Mirrored state is not repaired.

use alloy::primitives::B256;
use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::{
	models::{BlockHeader, Network},
	services::{blockchain::ChainClient, blockwatcher::error::BlockWatcherError},
	utils::metrics::record_reorg,
};

/// What a new head told the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockObservation {
	/// Height not seen before, consistent with its parent
	First,
	/// Same hash as already recorded
	Duplicate,
	/// Blocks above `fork_point` were replaced; `depth` known blocks changed
	Reorg { fork_point: u64, depth: u64 },
}

pub struct ReorgDetector {
	network: String,
	client: Arc<dyn ChainClient>,
	history_size: usize,
	by_number: BTreeMap<u64, BlockHeader>,
	by_hash: HashMap<B256, u64>,
}

impl ReorgDetector {
	pub fn new(network: &Network, client: Arc<dyn ChainClient>) -> Self {
		Self {
			network: network.slug.clone(),
			client,
			history_size: network.reorg_history_size.max(1),
			by_number: BTreeMap::new(),
			by_hash: HashMap::new(),
		}
	}

	pub fn known_blocks(&self) -> usize {
		self.by_number.len()
	}

	pub fn block(&self, number: u64) -> Option<&BlockHeader> {
		self.by_number.get(&number)
	}

	/// Fetches block `number` and compares it with the recorded chain
	pub async fn on_new_block(&mut self, number: u64) -> Result<BlockObservation, BlockWatcherError> {
		let header = self.fetch(number).await?;

		let replaces_known = match self.by_number.get(&number) {
			Some(known) if known.hash == header.hash => return Ok(BlockObservation::Duplicate),
			Some(_) => true,
			None => false,
		};
		let breaks_parent_link = number
			.checked_sub(1)
			.and_then(|parent| self.by_number.get(&parent))
			.is_some_and(|parent| parent.hash != header.parent_hash);

		if !replaces_known && !breaks_parent_link {
			self.record(header);
			return Ok(BlockObservation::First);
		}

		let (fork_point, depth) = self.rewind(header).await?;
		warn!(
			network = %self.network,
			head = number,
			fork_point,
			depth,
			"Chain reorganization detected"
		);
		record_reorg(&self.network);
		Ok(BlockObservation::Reorg { fork_point, depth })
	}

	/// Records `head` and re-fetches its ancestors until one links to a known
	/// hash. Returns the fork point and the number of replaced blocks.
	async fn rewind(&mut self, head: BlockHeader) -> Result<(u64, u64), BlockWatcherError> {
		let mut depth = u64::from(self.record(head.clone()));
		let mut cursor = head;

		loop {
			if let Some(fork_point) = self.by_hash.get(&cursor.parent_hash) {
				return Ok((*fork_point, depth));
			}
			let Some(parent) = cursor.number.checked_sub(1) else {
				return Ok((0, depth));
			};
			if !self.by_number.contains_key(&parent) {
				debug!(
					network = %self.network,
					block = parent,
					"Fork point older than the recorded history"
				);
				return Ok((parent, depth));
			}
			cursor = self.fetch(parent).await?;
			depth += u64::from(self.record(cursor.clone()));
		}
	}

	async fn fetch(&self, number: u64) -> Result<BlockHeader, BlockWatcherError> {
		let metadata = || {
			HashMap::from([
				("network".to_string(), self.network.clone()),
				("block_number".to_string(), number.to_string()),
			])
		};
		let header = self.client.get_block(number).await.map_err(|e| {
			BlockWatcherError::network_error("Failed to get block", Some(e.into()), Some(metadata()))
		})?;
		if header.number != number {
			return Err(BlockWatcherError::invariant_violation(
				format!(
					"Provider returned block {} when asked for {}",
					header.number, number
				),
				None,
				Some(metadata()),
			));
		}
		Ok(header)
	}

	/// Stores `header`, evicting the oldest heights beyond the history size.
	/// Returns whether a different block was recorded at that height.
	fn record(&mut self, header: BlockHeader) -> bool {
		let replaced = match self.by_number.insert(header.number, header.clone()) {
			Some(previous) if previous.hash != header.hash => {
				self.by_hash.remove(&previous.hash);
				true
			}
			_ => false,
		};
		self.by_hash.insert(header.hash, header.number);

		while self.by_number.len() > self.history_size {
			if let Some((_, oldest)) = self.by_number.pop_first() {
				self.by_hash.remove(&oldest.hash);
			}
		}
		replaced
	}

	/// Observes heads until the stream closes or the provider breaks an
	/// invariant
	pub async fn run(mut self, mut heads: broadcast::Receiver<u64>) {
		loop {
			match heads.recv().await {
				Ok(number) => match self.on_new_block(number).await {
					Ok(_) => {}
					Err(e) if e.is_fatal() => {
						error!(network = %self.network, "Reorg detector stopped: {}", e);
						return;
					}
					Err(e) => {
						warn!(network = %self.network, block = number, "Failed to check block: {}", e);
					}
				},
				Err(RecvError::Lagged(missed)) => {
					warn!(network = %self.network, missed, "Reorg detector lagged behind the head stream");
				}
				Err(RecvError::Closed) => break,
			}
		}
		info!(network = %self.network, "Reorg detector stopped");
	}
}
