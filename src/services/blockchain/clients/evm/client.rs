//! JSON-RPC implementation of [`ChainClient`] for EVM chains.

use alloy::primitives::{Address, Bytes};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
	models::{BlockHeader, ChainLog, Network},
	services::blockchain::{
		client::ChainClient,
		transports::{BlockchainTransport, HttpTransportClient},
	},
};

#[derive(Clone, Debug)]
pub struct EvmClient<T: Send + Sync + Clone> {
	http_client: T,
}

impl<T: Send + Sync + Clone> EvmClient<T> {
	pub fn new_with_transport(http_client: T) -> Self {
		Self { http_client }
	}
}

impl EvmClient<HttpTransportClient> {
	/// Connects to the RPC endpoints of `network`
	pub async fn new(network: &Network) -> Result<Self, anyhow::Error> {
		let client = HttpTransportClient::new(network, None).await?;
		Ok(Self::new_with_transport(client))
	}
}

/// Takes the `result` member out of a JSON-RPC response
fn extract_result(response: Value) -> Result<Value, anyhow::Error> {
	match response {
		Value::Object(mut body) => body
			.remove("result")
			.with_context(|| "Missing 'result' field"),
		_ => Err(anyhow::anyhow!("Missing 'result' field")),
	}
}

fn parse_hex_u64(value: &Value) -> Result<u64, anyhow::Error> {
	let hex_str = value
		.as_str()
		.with_context(|| format!("Expected a hex quantity, got {}", value))?;
	u64::from_str_radix(hex_str.trim_start_matches("0x"), 16)
		.with_context(|| format!("Failed to parse hex quantity {}", hex_str))
}

/// Block parameter of a read, `latest` when unpinned
fn block_tag(block: Option<u64>) -> String {
	match block {
		Some(number) => format!("0x{:x}", number),
		None => "latest".to_string(),
	}
}

#[async_trait]
impl<T: Send + Sync + Clone + BlockchainTransport> ChainClient for EvmClient<T> {
	#[instrument(skip(self))]
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error> {
		let response = self
			.http_client
			.send_raw_request::<Value>("eth_blockNumber", None)
			.await
			.with_context(|| "Failed to get latest block number")?;

		parse_hex_u64(&extract_result(response)?)
	}

	#[instrument(skip(self))]
	async fn get_block(&self, number: u64) -> Result<BlockHeader, anyhow::Error> {
		let params = json!([format!("0x{:x}", number), false]);
		let response = self
			.http_client
			.send_raw_request("eth_getBlockByNumber", Some(params))
			.await
			.with_context(|| format!("Failed to get block: {}", number))?;

		let block = extract_result(response)?;
		if block.is_null() {
			return Err(anyhow::anyhow!("Block not found: {}", number));
		}

		serde_json::from_value(block).with_context(|| format!("Failed to parse block {}", number))
	}

	#[instrument(skip(self, addresses), fields(from_block, to_block))]
	async fn get_logs(
		&self,
		from_block: u64,
		to_block: u64,
		addresses: Option<Vec<Address>>,
	) -> Result<Vec<ChainLog>, anyhow::Error> {
		let params = json!([{
			"fromBlock": format!("0x{:x}", from_block),
			"toBlock": format!("0x{:x}", to_block),
			"address": addresses
		}]);

		let response = self
			.http_client
			.send_raw_request("eth_getLogs", Some(params))
			.await
			.with_context(|| format!("Failed to get logs for blocks: {} - {}", from_block, to_block))?;

		serde_json::from_value(extract_result(response)?).with_context(|| "Failed to parse logs")
	}

	#[instrument(skip(self, data))]
	async fn call(
		&self,
		to: Address,
		data: Bytes,
		block: Option<u64>,
	) -> Result<Bytes, anyhow::Error> {
		let params = json!([{ "to": to, "data": data }, block_tag(block)]);
		let response = self
			.http_client
			.send_raw_request("eth_call", Some(params))
			.await
			.with_context(|| format!("Failed to call contract {}", to))?;

		serde_json::from_value(extract_result(response)?)
			.with_context(|| "Failed to parse call result")
	}
}
