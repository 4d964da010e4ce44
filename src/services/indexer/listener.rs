//! Applies single logs.
//!
//! A log is recorded in the event collection before its handler runs, inside
//! one session per event. Replays are detected on the event key and skipped.
//! A handler failure is not retried: the event is recorded as FAILURE and the
//! pipeline moves on. Aborting the event session also rolls back the contracts
//! it registered or unregistered.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
	models::{format_address, ChainLog, EventKey, EventRecord, EventStatus},
	repositories::Session,
	services::{
		blockchain::ChainClient,
		indexer::{graph::RegisteredContract, BlockchainRepository, IndexerError},
	},
	utils::metrics::{record_event, record_skipped_event},
};

/// Block dates kept before the cache is reset
const BLOCK_DATE_CACHE_SIZE: usize = 4096;

/// What happened to one log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
	Applied,
	/// Already recorded, pending or removed
	Skipped,
	/// Recorded as FAILURE
	Failed,
}

pub struct EventListener {
	network: String,
	chain_id: u64,
	block_dates: Mutex<HashMap<u64, String>>,
}

impl EventListener {
	pub fn new(network: impl Into<String>, chain_id: u64) -> Self {
		Self {
			network: network.into(),
			chain_id,
			block_dates: Mutex::new(HashMap::new()),
		}
	}

	/// RFC 3339 date of a block, fetched once per block number
	pub async fn block_date(
		&self,
		client: &dyn ChainClient,
		block_number: u64,
	) -> Result<String, IndexerError> {
		if let Some(date) = self.block_dates.lock().await.get(&block_number) {
			return Ok(date.clone());
		}

		let header = client.get_block(block_number).await.map_err(|e| {
			IndexerError::chain_error(
				"Failed to get block",
				Some(e.into()),
				Some(HashMap::from([(
					"block_number".to_string(),
					block_number.to_string(),
				)])),
			)
		})?;
		if header.number != block_number {
			return Err(IndexerError::invariant_violation(
				format!(
					"Provider returned block {} when asked for {}",
					header.number, block_number
				),
				None,
				None,
			));
		}

		let date = header.date();
		let mut dates = self.block_dates.lock().await;
		if dates.len() >= BLOCK_DATE_CACHE_SIZE {
			dates.clear();
		}
		dates.insert(block_number, date.clone());
		Ok(date)
	}

	/// Decodes, records and applies one log of a registered contract.
	///
	/// Without a `session` the listener owns one for the event; with one, the
	/// event and its effects join the caller's session. Only storage and chain
	/// failures are returned as errors; handler failures end as
	/// [`EventOutcome::Failed`].
	pub async fn handle_log(
		&self,
		repository: &BlockchainRepository,
		entry: &RegisteredContract,
		log: &ChainLog,
		session: Option<&Session>,
	) -> Result<EventOutcome, IndexerError> {
		if !log.is_mined() || log.removed == Some(true) {
			debug!(tx_hash = %log.transaction_hash_hex(), "Skipping pending or removed log");
			return Ok(EventOutcome::Skipped);
		}

		let position = log.position();
		let key = EventKey {
			chain_id: self.chain_id,
			address: log.address,
			block_number: position.block_number,
			tx_index: position.tx_index,
			log_index: position.log_index,
		};
		let store = repository.store();

		if store.exists_event(&key, session).await? {
			debug!(event = %key, "Skipping already recorded event");
			record_skipped_event(&self.network, entry.kind);
			return Ok(EventOutcome::Skipped);
		}

		let block_date = self
			.block_date(repository.client().as_ref(), position.block_number)
			.await?;
		let decoded = entry.interface.decode_log(log);
		let mut record = EventRecord {
			key,
			tx_hash: log.transaction_hash_hex(),
			contract: entry.kind,
			name: decoded
				.as_ref()
				.map(|decoded| decoded.name.clone())
				.unwrap_or_else(|_| "Unknown".to_string()),
			topics: log.topics.iter().map(|topic| format!("0x{:x}", topic)).collect(),
			args: decoded
				.as_ref()
				.map(|decoded| decoded.format_args())
				.unwrap_or_default(),
			block_date,
			status: EventStatus::Queued,
		};

		let decoded = match decoded {
			Ok(decoded) => decoded,
			Err(e) => {
				error!(
					chain_id = self.chain_id,
					contract = %format_address(&log.address),
					tx_hash = %record.tx_hash,
					"Undecodable log recorded as failed: {}",
					e
				);
				record.status = EventStatus::Failure;
				store.save_event(&record, session).await?;
				record_event(&self.network, entry.kind, EventStatus::Failure);
				return Ok(EventOutcome::Failed);
			}
		};

		let owned = match session {
			Some(_) => None,
			None => Some(repository.start_session().await?),
		};
		let active = session.or(owned.as_ref());

		let applied = async {
			store.save_event(&record, active).await?;
			let result = entry
				.handler
				.on_event(repository, active, &decoded, key.block_number)
				.await;
			if result.is_ok() {
				store
					.update_event_status(&key, EventStatus::Success, active)
					.await?;
			}
			Ok::<_, IndexerError>(result)
		}
		.await;

		let outcome = match applied {
			Ok(Ok(())) => {
				if let Some(owned) = owned {
					repository.commit_session(owned).await?;
				}
				EventOutcome::Applied
			}
			Ok(Err(e)) => {
				error!(
					chain_id = self.chain_id,
					contract = %format_address(&log.address),
					event = %decoded.name,
					args = ?record.args,
					tx_hash = %record.tx_hash,
					fatal = e.is_fatal(),
					"Event handler failed: {}",
					e.chain_text()
				);
				record.status = EventStatus::Failure;
				match owned {
					Some(owned) => {
						repository.abort_session(owned).await?;
						self.record_failure(repository, &record).await?;
					}
					None => {
						store
							.update_event_status(&key, EventStatus::Failure, session)
							.await?
					}
				}
				EventOutcome::Failed
			}
			Err(e) => {
				if let Some(owned) = owned {
					repository.abort_session(owned).await?;
				}
				return Err(e);
			}
		};

		let status = match outcome {
			EventOutcome::Applied => EventStatus::Success,
			_ => EventStatus::Failure,
		};
		record_event(&self.network, entry.kind, status);
		Ok(outcome)
	}

	/// Commits a FAILURE record in a session of its own
	async fn record_failure(
		&self,
		repository: &BlockchainRepository,
		record: &EventRecord,
	) -> Result<(), IndexerError> {
		let session = repository.start_session().await?;
		if let Err(e) = repository.store().save_event(record, Some(&session)).await {
			repository.abort_session(session).await?;
			return Err(e.into());
		}
		repository.commit_session(session).await
	}
}
