//! Configuration loading and validation.
//!
//! Network definitions are the only configuration files: each one names the
//! chain, its RPC endpoints and the Directory the indexer starts from.

#![allow(clippy::result_large_err)]

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

use crate::utils::normalize_string;

mod error;
mod network_config;

pub use error::ConfigError;

/// A configuration type read from one JSON file per instance
#[async_trait]
pub trait ConfigLoader: Sized {
	/// Directory scanned by [`ConfigLoader::load_all`] when no path is given
	const DEFAULT_DIR: &'static str;

	/// Short label of the type, used in error messages
	const LABEL: &'static str;

	/// Loads every JSON file of `path`, keyed by file stem
	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>;

	/// Reads, resolves and validates a single file
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	fn validate(&self) -> Result<(), ConfigError>;

	/// Logs a warning when an endpoint uses an insecure protocol
	fn validate_protocol(&self);

	/// Replaces secret references with their resolved values
	async fn resolve_secrets(&self) -> Result<Self, ConfigError>;

	/// `(field, value)` pairs that no two loaded instances may share
	fn unique_fields(&self) -> Vec<(&'static str, &str)>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}

	/// Rejects `current_instance` when one of its unique fields matches an
	/// already loaded instance, ignoring case and surrounding whitespace
	fn validate_uniqueness(
		instances: &[&Self],
		current_instance: &Self,
		file_path: &str,
	) -> Result<(), ConfigError> {
		for (field, value) in current_instance.unique_fields() {
			let wanted = normalize_string(value);
			let duplicate = instances.iter().any(|existing| {
				existing
					.unique_fields()
					.iter()
					.any(|(other, existing_value)| {
						*other == field && normalize_string(existing_value) == wanted
					})
			});
			if duplicate {
				return Err(ConfigError::validation_error(
					format!("Duplicate {} {} found: '{}'", Self::LABEL, field, value),
					None,
					Some(HashMap::from([
						(format!("{}_{}", Self::LABEL, field), value.to_string()),
						("path".to_string(), file_path.to_string()),
					])),
				));
			}
		}
		Ok(())
	}
}
