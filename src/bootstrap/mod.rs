//! Bootstrap module for initializing services and starting the indexing pipelines.
//!
//! # Services
//! - `NetworkService`: configured networks, optionally narrowed to one slug
//! - `MemoryStateRepository`: state store of a network, persisted under the data directory
//! - `BroadcastBroker`: fan-out of state updates
//!
//! # Pipelines
//! - `prepare_network`: registers the Directory graph and resolves where loading starts
//! - `start_network_indexer`: starts the events loader, the head watcher and the reorg
//!   detector of one network

use std::{
	error::Error,
	path::{Path, PathBuf},
	sync::Arc,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, instrument, warn};

use crate::{
	models::{ContractKind, Network},
	repositories::{NetworkRepositoryTrait, NetworkService, StateRepository},
	services::{
		blockchain::ChainClient,
		blockwatcher::{BlockWatcherError, HeadWatcher, JobSchedulerTrait, ReorgDetector},
		indexer::{BlockchainRepository, IndexerError},
		notification::NotificationBroker,
	},
	utils::metrics::record_registered_contracts,
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

type ServiceResult<N> = Result<(Vec<Network>, Arc<Mutex<NetworkService<N>>>)>;

/// Loads the configured networks.
///
/// # Arguments
/// * `network_service` - Preloaded service, loaded from the default directory when `None`
/// * `only` - Slug of the single network to index
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or `only` names an
/// unknown network
pub async fn initialize_services<N>(
	network_service: Option<NetworkService<N>>,
	only: Option<&str>,
) -> ServiceResult<N>
where
	N: NetworkRepositoryTrait + Send + Sync + 'static,
{
	let network_service = match network_service {
		Some(service) => service,
		None => {
			let repository = N::new(None).await?;
			NetworkService::<N>::new_with_repository(repository)?
		}
	};

	let networks = select_networks(network_service.get_all().into_values().collect(), only)?;
	Ok((networks, Arc::new(Mutex::new(network_service))))
}

/// Keeps the network named `only`, or every network sorted by slug
pub fn select_networks(mut networks: Vec<Network>, only: Option<&str>) -> Result<Vec<Network>> {
	networks.sort_by(|a, b| a.slug.cmp(&b.slug));
	match only {
		None => Ok(networks),
		Some(slug) => {
			let selected: Vec<Network> = networks
				.into_iter()
				.filter(|network| network.slug == slug)
				.collect();
			if selected.is_empty() {
				return Err(format!("Network '{}' is not configured", slug).into());
			}
			Ok(selected)
		}
	}
}

/// State file of `network` under `data_dir`
pub fn state_file_path(data_dir: &Path, network: &Network) -> PathBuf {
	data_dir.join(format!("{}.json", network.slug))
}

/// First checkpoint of the events loader: the persisted one, else the
/// configured start block, else the current head
pub fn resolve_start_block(checkpoint: Option<u64>, start_block: Option<u64>, head: u64) -> u64 {
	checkpoint.or(start_block).unwrap_or(head).min(head)
}

/// Registers the Directory graph of the repository's network and returns the
/// block the events loader starts after
#[instrument(skip_all, fields(network = %repository.network().slug, chain_id = repository.chain_id()))]
pub async fn prepare_network(repository: &Arc<BlockchainRepository>) -> std::result::Result<u64, IndexerError> {
	let network = repository.network();
	repository
		.registry()
		.register_directory(network.directory_address)
		.await?;

	let graph = repository.graph();
	for kind in ContractKind::ALL {
		record_registered_contracts(&network.slug, kind, graph.addresses_of(kind).await.len());
	}

	let head = repository.get_block_number().await?;
	let checkpoint = repository
		.store()
		.get_last_update_block(repository.chain_id())
		.await?;
	let from_block = resolve_start_block(checkpoint, network.start_block, head);

	info!(
		contracts = graph.len().await,
		head,
		from_block,
		"Registration graph loaded"
	);
	Ok(from_block)
}

/// Running pipelines of one network
pub struct NetworkIndexer<J>
where
	J: JobSchedulerTrait,
{
	pub repository: Arc<BlockchainRepository>,
	watcher: HeadWatcher<J>,
	tasks: Vec<JoinHandle<()>>,
}

impl<J> NetworkIndexer<J>
where
	J: JobSchedulerTrait,
{
	pub fn network(&self) -> &Network {
		self.repository.network()
	}

	/// Stops the head watcher, then the loader and the reorg detector
	pub async fn stop(mut self) -> std::result::Result<(), BlockWatcherError> {
		let stopped = self.watcher.stop().await;
		for task in self.tasks.drain(..) {
			task.abort();
			if let Err(e) = task.await {
				if !e.is_cancelled() {
					warn!(network = %self.repository.network().slug, "Indexer task failed: {}", e);
				}
			}
		}
		stopped
	}
}

/// Registers the graph of `network` and starts its pipelines.
///
/// # Arguments
/// * `network` - Network to index
/// * `client` - Chain client of the network
/// * `store` - State store of the network
/// * `broker` - Sink of state updates
///
/// # Errors
/// Returns an error if the registration walk fails or the head watcher
/// cannot be scheduled
pub async fn start_network_indexer<J>(
	network: Network,
	client: Arc<dyn ChainClient>,
	store: Arc<dyn StateRepository>,
	broker: Arc<dyn NotificationBroker>,
) -> Result<NetworkIndexer<J>>
where
	J: JobSchedulerTrait + 'static,
{
	let repository = Arc::new(BlockchainRepository::new(
		network.clone(),
		client.clone(),
		store,
		broker,
	));
	let from_block = prepare_network(&repository).await?;

	let mut watcher = HeadWatcher::<J>::new(network.clone()).await?;
	let loader = repository
		.watch_for_updates(from_block, watcher.subscribe())
		.await?;
	let detector = tokio::spawn(ReorgDetector::new(&network, client.clone()).run(watcher.subscribe()));

	if let Err(e) = watcher.start(client).await {
		loader.abort();
		detector.abort();
		return Err(e.into());
	}

	Ok(NetworkIndexer {
		repository,
		watcher,
		tasks: vec![loader, detector],
	})
}
