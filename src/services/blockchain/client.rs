//! Chain access used by the indexer.
//!
//! Everything the indexer needs from a node goes through [`ChainClient`]:
//! the head height, block headers, filtered logs and read-only calls.

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::models::{BlockHeader, ChainLog};

/// Read access to one chain.
///
/// Errors are `anyhow` chains; the outermost context names the failing
/// request and the innermost carries the provider message.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Current head height
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error>;

	/// Header of block `number`
	async fn get_block(&self, number: u64) -> Result<BlockHeader, anyhow::Error>;

	/// Logs of `[from_block, to_block]` emitted by `addresses`, every
	/// contract when `None`
	async fn get_logs(
		&self,
		from_block: u64,
		to_block: u64,
		addresses: Option<Vec<Address>>,
	) -> Result<Vec<ChainLog>, anyhow::Error>;

	/// `eth_call` against block `block`, the latest block when `None`
	async fn call(
		&self,
		to: Address,
		data: Bytes,
		block: Option<u64>,
	) -> Result<Bytes, anyhow::Error>;
}
