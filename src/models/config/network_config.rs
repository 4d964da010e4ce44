//! Network configuration loading and validation.
//!
//! Implements [`ConfigLoader`] for [`Network`], reading one JSON file per
//! network from `config/networks`.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::{collections::HashMap, path::Path, str::FromStr};

use crate::{
	models::{config::error::ConfigError, ConfigLoader, Network, SecretValue},
	utils::{get_cron_interval_ms, is_valid_slug, DEFAULT_NETWORKS_DIR},
};

impl Network {
	/// Approximate number of blocks produced between two head polls.
	///
	/// Used to warn when `blocks_buffer` is smaller than what a single poll
	/// interval yields, which would cause one RPC batch per poll regardless.
	pub fn blocks_per_poll(&self) -> u64 {
		let cron_interval_ms = get_cron_interval_ms(&self.cron_schedule).unwrap_or(0) as u64;
		cron_interval_ms / self.block_time_ms.max(1)
	}

	/// Path-style metadata for errors about this network
	fn metadata(&self) -> Option<HashMap<String, String>> {
		Some(HashMap::from([("network".to_string(), self.slug.clone())]))
	}
}

#[async_trait]
impl ConfigLoader for Network {
	const DEFAULT_DIR: &'static str = DEFAULT_NETWORKS_DIR;
	const LABEL: &'static str = "network";

	async fn resolve_secrets(&self) -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();
		let mut network = self.clone();

		for rpc_url in &mut network.rpc_urls {
			let resolved_url = rpc_url.url.resolve().await.map_err(|e| {
				ConfigError::parse_error(
					format!("failed to resolve RPC URL: {}", e),
					Some(e),
					None,
				)
			})?;
			rpc_url.url = SecretValue::Plain(resolved_url);
		}
		Ok(network)
	}

	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let network_dir = path.unwrap_or(Path::new(Self::DEFAULT_DIR));
		let path_metadata = || {
			Some(HashMap::from([(
				"path".to_string(),
				network_dir.display().to_string(),
			)]))
		};
		let mut pairs = Vec::new();

		if !network_dir.exists() {
			return Err(ConfigError::file_error(
				"networks directory not found",
				None,
				path_metadata(),
			));
		}

		let entries = std::fs::read_dir(network_dir).map_err(|e| {
			ConfigError::file_error(
				format!("failed to read networks directory: {}", e),
				Some(Box::new(e)),
				path_metadata(),
			)
		})?;

		for entry in entries {
			let entry = entry.map_err(|e| {
				ConfigError::file_error(
					format!("failed to read directory entry: {}", e),
					Some(Box::new(e)),
					path_metadata(),
				)
			})?;
			let path = entry.path();

			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			let network = Self::load_from_path(&path).await?;

			let existing: Vec<&Network> = pairs.iter().map(|(_, network)| network).collect();
			Self::validate_uniqueness(&existing, &network, &path.display().to_string())?;
			if let Some(other) = existing.iter().find(|other| other.chain_id == network.chain_id) {
				tracing::warn!(
					"Networks '{}' and '{}' share chain id {}, their stored state will overlap",
					other.slug,
					network.slug,
					network.chain_id
				);
			}

			pairs.push((name, network));
		}

		Ok(T::from_iter(pairs))
	}

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let path_metadata = Some(HashMap::from([(
			"path".to_string(),
			path.display().to_string(),
		)]));
		let file = std::fs::File::open(path).map_err(|e| {
			ConfigError::file_error(
				format!("failed to open network config file: {}", e),
				Some(Box::new(e)),
				path_metadata.clone(),
			)
		})?;
		let config: Network = serde_json::from_reader(file).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse network config: {}", e),
				Some(Box::new(e)),
				path_metadata,
			)
		})?;

		let config = config.resolve_secrets().await?;
		config.validate()?;

		Ok(config)
	}

	/// Ensures that:
	/// - name and slug are usable identifiers
	/// - at least one well-formed RPC URL is configured
	/// - the Directory address and loader parameters make sense
	fn validate(&self) -> Result<(), ConfigError> {
		if self.name.is_empty() {
			return Err(ConfigError::validation_error(
				"Network name is required",
				None,
				self.metadata(),
			));
		}

		if !is_valid_slug(&self.slug) {
			return Err(ConfigError::validation_error(
				"Slug must contain only lowercase letters, numbers, and underscores",
				None,
				self.metadata(),
			));
		}

		if self.chain_id == 0 {
			return Err(ConfigError::validation_error(
				"Chain ID must be greater than 0",
				None,
				self.metadata(),
			));
		}

		if self.rpc_urls.is_empty() {
			return Err(ConfigError::validation_error(
				"At least one RPC URL is required",
				None,
				self.metadata(),
			));
		}

		if !self.rpc_urls.iter().all(|rpc_url| rpc_url.type_ == "rpc") {
			return Err(ConfigError::validation_error(
				"RPC URL type must be one of: rpc",
				None,
				self.metadata(),
			));
		}

		if !self.rpc_urls.iter().all(|rpc_url| {
			rpc_url.url.starts_with("http://") || rpc_url.url.starts_with("https://")
		}) {
			return Err(ConfigError::validation_error(
				"All RPC URLs must start with http:// or https://",
				None,
				self.metadata(),
			));
		}

		if !self.rpc_urls.iter().all(|rpc_url| rpc_url.weight <= 100) {
			return Err(ConfigError::validation_error(
				"All RPC URL weights must be between 0 and 100",
				None,
				self.metadata(),
			));
		}

		if self.block_time_ms < 100 {
			return Err(ConfigError::validation_error(
				"Block time must be at least 100ms",
				None,
				self.metadata(),
			));
		}

		if self.cron_schedule.is_empty() {
			return Err(ConfigError::validation_error(
				"Cron schedule must be provided",
				None,
				self.metadata(),
			));
		}

		if let Err(e) = cron::Schedule::from_str(&self.cron_schedule) {
			return Err(ConfigError::validation_error(
				e.to_string(),
				None,
				self.metadata(),
			));
		}

		if self.directory_address == Address::ZERO {
			return Err(ConfigError::validation_error(
				"directory_address must not be the zero address",
				None,
				self.metadata(),
			));
		}

		if self.blocks_buffer == 0 {
			return Err(ConfigError::validation_error(
				"blocks_buffer must be at least 1",
				None,
				self.metadata(),
			));
		}

		if self.reorg_history_size == 0 {
			return Err(ConfigError::validation_error(
				"reorg_history_size must be at least 1",
				None,
				self.metadata(),
			));
		}

		if let Err(message) = self.rpc_retry.check() {
			return Err(ConfigError::validation_error(
				message,
				None,
				self.metadata(),
			));
		}

		let blocks_per_poll = self.blocks_per_poll();
		if blocks_per_poll > 0 && self.blocks_buffer < blocks_per_poll {
			tracing::warn!(
				"Network '{}' blocks_buffer ({}) is below the blocks produced per poll ({})",
				self.slug,
				self.blocks_buffer,
				blocks_per_poll
			);
		}

		self.validate_protocol();

		Ok(())
	}

	fn validate_protocol(&self) {
		for rpc_url in &self.rpc_urls {
			if rpc_url.url.starts_with("http://") {
				tracing::warn!(
					"Network '{}' uses an insecure RPC URL: {}",
					self.slug,
					rpc_url.url.as_str()
				);
			}
		}
	}

	fn unique_fields(&self) -> Vec<(&'static str, &str)> {
		vec![("name", self.name.as_str()), ("slug", self.slug.as_str())]
	}
}
