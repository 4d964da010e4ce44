//! Retrying HTTP clients used by the RPC transports.
//!
//! Each network may carry an `rpc_retry` section; missing keys fall back to
//! the defaults below.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
	policies::ExponentialBackoff, Jitter, RetryTransientMiddleware, RetryableStrategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_retries() -> u32 {
	3
}

fn default_initial_backoff_ms() -> u64 {
	250
}

fn default_max_backoff_ms() -> u64 {
	10_000
}

fn default_base_for_backoff() -> u32 {
	2
}

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
	None,
	/// Randomizes the whole backoff duration
	#[default]
	Full,
}

/// Retry policy of the JSON-RPC requests of a network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
	/// Retries after the first attempt, for transient failures only
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_base_for_backoff")]
	pub base_for_backoff: u32,
	#[serde(default = "default_initial_backoff_ms")]
	pub initial_backoff_ms: u64,
	#[serde(default = "default_max_backoff_ms")]
	pub max_backoff_ms: u64,
	#[serde(default)]
	pub jitter: JitterSetting,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			base_for_backoff: default_base_for_backoff(),
			initial_backoff_ms: default_initial_backoff_ms(),
			max_backoff_ms: default_max_backoff_ms(),
			jitter: JitterSetting::default(),
		}
	}
}

impl RetryConfig {
	pub fn initial_backoff(&self) -> Duration {
		Duration::from_millis(self.initial_backoff_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_millis(self.max_backoff_ms)
	}

	/// Rejects bounds the backoff policy cannot work with
	pub fn check(&self) -> Result<(), String> {
		if self.base_for_backoff < 2 {
			return Err("rpc_retry.base_for_backoff must be at least 2".to_string());
		}
		if self.initial_backoff_ms == 0 || self.initial_backoff_ms > self.max_backoff_ms {
			return Err(
				"rpc_retry.initial_backoff_ms must be positive and at most max_backoff_ms"
					.to_string(),
			);
		}
		Ok(())
	}
}

/// Wraps `base_client` with exponential-backoff retries.
///
/// `custom_strategy` decides which responses are retried; the middleware
/// default is used when it is `None`.
pub fn create_retryable_http_client<S>(
	config: &RetryConfig,
	base_client: reqwest::Client,
	custom_strategy: Option<S>,
) -> ClientWithMiddleware
where
	S: RetryableStrategy + Send + Sync + 'static,
{
	let jitter = match config.jitter {
		JitterSetting::None => Jitter::None,
		JitterSetting::Full => Jitter::Full,
	};
	let retry_policy = ExponentialBackoff::builder()
		.jitter(jitter)
		.base(config.base_for_backoff)
		.retry_bounds(config.initial_backoff(), config.max_backoff())
		.build_with_max_retries(config.max_retries);

	let builder = ClientBuilder::new(base_client);
	match custom_strategy {
		Some(strategy) => builder.with(RetryTransientMiddleware::new_with_policy_and_strategy(
			retry_policy,
			strategy,
		)),
		None => builder.with(RetryTransientMiddleware::new_with_policy(retry_policy)),
	}
	.build()
}
