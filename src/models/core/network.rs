use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{models::SecretValue, utils::RetryConfig};

fn default_blocks_lag() -> u64 {
	2
}

fn default_blocks_buffer() -> u64 {
	5
}

fn default_reorg_history_size() -> usize {
	256
}

/// Configuration for connecting to and indexing one EVM network.
///
/// Besides connection details, a network names the Directory contract the
/// registration graph starts from and the parameters of the events loader.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Network {
	/// Unique identifier for this network
	pub slug: String,

	/// Human-readable name of the network
	pub name: String,

	/// Chain ID, part of every stored key
	pub chain_id: u64,

	/// List of RPC endpoints with their weights for load balancing
	pub rpc_urls: Vec<RpcUrl>,

	/// Average block time in milliseconds
	pub block_time_ms: u64,

	/// Cron expression for how often to poll the chain head
	pub cron_schedule: String,

	/// Root Directory contract of the registration graph
	pub directory_address: Address,

	/// Block to start loading events from when no checkpoint exists
	#[serde(default)]
	pub start_block: Option<u64>,

	/// Number of blocks kept between the chain head and the loaded range
	#[serde(default = "default_blocks_lag")]
	pub blocks_lag: u64,

	/// Minimum number of blocks loaded per batch
	#[serde(default = "default_blocks_buffer")]
	pub blocks_buffer: u64,

	/// Number of block heights remembered by the reorg detector
	#[serde(default = "default_reorg_history_size")]
	pub reorg_history_size: usize,

	/// Backoff applied to transient RPC failures
	#[serde(default)]
	pub rpc_retry: RetryConfig,
}

/// RPC endpoint configuration with load balancing weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RpcUrl {
	/// Type of RPC endpoint (e.g. "rpc")
	pub type_: String,

	/// URL of the RPC endpoint (can be a secret value)
	pub url: SecretValue,

	/// Weight for load balancing (0-100)
	pub weight: u32,
}
