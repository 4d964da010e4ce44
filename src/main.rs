//! Charged token indexer entry point.
//!
//! This binary mirrors the on-chain state of the Charged token contracts of every
//! configured network into the state store and publishes each update.
//!
//! # Architecture
//! The service is built around several key components:
//! - Networks: chain connection, root Directory and loader parameters
//! - Registration graph: the contracts reachable from the Directory
//! - Pipelines: head watcher, events loader and reorg detector per network
//!
//! # Flow
//! 1. Loads network configurations from the default directory
//! 2. Opens the state store of each network under the data directory
//! 3. Registers the Directory graph, catching up missed events
//! 4. Loads new block ranges as the head advances
//! 5. Handles graceful shutdown on Ctrl+C

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use crate::{
	bootstrap::{initialize_services, start_network_indexer, state_file_path, NetworkIndexer, Result},
	repositories::{MemoryStateRepository, NetworkRepository},
	services::{
		blockchain::{ChainClient, ClientPool, ClientPoolTrait},
		notification::BroadcastBroker,
	},
	utils::{
		constants::{DEFAULT_STATE_DATA_DIR, DOCUMENTATION_URL, NOTIFICATION_CHANNEL_CAPACITY},
		logging::setup_logging,
		metrics::server::create_metrics_server,
		parse_network_slug, parse_string_to_bytes_size,
	},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::env::{set_var, var};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info, instrument};

#[derive(Parser)]
#[command(
	name = "charged-token-indexer",
	about = "Mirrors the state of Charged token contracts into a local store and publishes every update.",
	version
)]
struct Cli {
	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Address to start the metrics server on (default: 127.0.0.1:8081)
	#[arg(long, value_name = "HOST:PORT")]
	metrics_address: Option<String>,

	/// Enable metrics server
	#[arg(long)]
	metrics: bool,

	/// Index only this network
	#[arg(long, value_name = "NETWORK_SLUG", value_parser = parse_network_slug)]
	network: Option<String>,

	/// Directory of the persisted state (default: data/)
	#[arg(long, value_name = "PATH")]
	data_dir: Option<String>,

	/// Validate configuration files without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		// Reload environment variables from .env file
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}

		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if self.metrics {
			set_var("METRICS_ENABLED", "true");
		}

		if let Some(address) = &self.metrics_address {
			if let Some(port) = address.split(':').nth(1) {
				set_var("METRICS_PORT", port);
			}
		}

		if let Some(path) = &self.data_dir {
			set_var("STATE_DATA_DIR", path);
		}
	}
}

/// Main entry point for the indexer.
///
/// # Errors
/// Returns an error if configuration loading fails or if no network could be started.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	if cli.check {
		validate_configuration(cli.network.as_deref()).await;
		return Ok(());
	}

	let (networks, network_service) =
		initialize_services::<NetworkRepository>(None, cli.network.as_deref())
			.await
			.map_err(|e| anyhow::anyhow!("Failed to initialize services: {}. Please refer to the documentation quickstart ({}) on how to configure the service.", e, DOCUMENTATION_URL))?;

	if networks.is_empty() {
		info!("No networks configured. Exiting...");
		return Ok(());
	}

	let metrics_enabled =
		cli.metrics || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false);

	let metrics_address = if var("IN_DOCKER").unwrap_or_default() == "true" {
		var("METRICS_PORT")
			.map(|port| format!("0.0.0.0:{}", port))
			.unwrap_or_else(|_| "0.0.0.0:8081".to_string())
	} else {
		cli.metrics_address
			.clone()
			.unwrap_or_else(|| "127.0.0.1:8081".to_string())
	};

	let metrics_server = if metrics_enabled {
		info!("Metrics server enabled, starting on {}", metrics_address);
		match create_metrics_server(metrics_address, network_service.clone()) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	let data_dir = PathBuf::from(var("STATE_DATA_DIR").unwrap_or_else(|_| DEFAULT_STATE_DATA_DIR.to_string()));
	let client_pool = Arc::new(ClientPool::new());
	let broker = Arc::new(BroadcastBroker::new(NOTIFICATION_CHANNEL_CAPACITY));

	let mut indexers: Vec<NetworkIndexer<JobScheduler>> = Vec::new();
	let mut stores: Vec<(String, Arc<MemoryStateRepository>)> = Vec::new();
	for network in networks {
		let client: Arc<dyn ChainClient> = match client_pool.get_client(&network).await {
			Ok(client) => client as Arc<dyn ChainClient>,
			Err(e) => {
				error!("Failed to get chain client for network {}: {}", network.slug, e);
				continue;
			}
		};
		let store = match MemoryStateRepository::open(&state_file_path(&data_dir, &network)).await {
			Ok(store) => Arc::new(store),
			Err(e) => {
				error!("Failed to open state store for network {}: {}", network.slug, e);
				continue;
			}
		};

		let slug = network.slug.clone();
		match start_network_indexer::<JobScheduler>(network, client, store.clone(), broker.clone()).await {
			Ok(indexer) => {
				indexers.push(indexer);
				stores.push((slug, store));
			}
			Err(e) => error!("Failed to start indexer for network {}: {}", slug, e),
		}
	}

	if indexers.is_empty() {
		return Err(anyhow::anyhow!("No network indexer could be started").into());
	}

	info!("Service started. Press Ctrl+C to shutdown");

	let ctrl_c = tokio::signal::ctrl_c();

	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		let _ = ctrl_c.await;
		info!("Shutdown signal received, stopping services...");
	}

	let shutdown_futures = indexers.into_iter().map(|indexer| indexer.stop());
	for result in futures::future::join_all(shutdown_futures).await {
		if let Err(e) = result {
			error!("Error during shutdown: {}", e);
		}
	}
	for (slug, store) in stores {
		if let Err(e) = store.flush().await {
			error!("Failed to write state of network {}: {}", slug, e);
		}
	}

	info!("Shutdown complete");
	Ok(())
}

/// Validates configuration files and their structure
#[instrument]
async fn validate_configuration(only: Option<&str>) {
	info!("Validating configuration files...");

	match initialize_services::<NetworkRepository>(None, only).await {
		Ok((networks, _)) => {
			if networks.is_empty() {
				error!("No networks configured. Please refer to the documentation quickstart ({}) for network configuration.", DOCUMENTATION_URL);
				return;
			}
			for network in &networks {
				info!(
					"✓ Network {} (chain {}), Directory {}",
					network.slug,
					network.chain_id,
					crate::models::format_address(&network.directory_address)
				);
			}
			info!("Configuration validation completed successfully!");
		}
		Err(e) => {
			error!("{}.\nPlease refer to the documentation quickstart ({}) for proper configuration setup.", e, DOCUMENTATION_URL);
		}
	}
}
