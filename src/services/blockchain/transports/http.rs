//! JSON-RPC over HTTP with weighted endpoints and failover.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::{
	models::Network,
	services::blockchain::transports::{
		BlockchainTransport, EndpointManager, RotatingTransport, TransientErrorRetryStrategy,
		TransportError,
	},
	utils::http::create_retryable_http_client,
};

/// HTTP transport shared by every request of a network.
///
/// Cloning is cheap: the endpoint state lives behind `Arc`s.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	pub client: ClientWithMiddleware,
	endpoint_manager: EndpointManager,
	/// Raw JSON-RPC body used to test an endpoint, `net_version` when unset
	test_connection_payload: Option<String>,
}

fn default_test_payload() -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"method": "net_version",
		"params": []
	})
}

impl HttpTransportClient {
	/// Connects to the heaviest reachable RPC URL of `network`.
	///
	/// Only URLs of type `rpc` with a positive weight are considered; the
	/// others become fallbacks in descending weight order.
	pub async fn new(
		network: &Network,
		test_connection_payload: Option<String>,
	) -> Result<Self, anyhow::Error> {
		let mut rpc_urls: Vec<_> = network
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.type_ == "rpc" && rpc_url.weight > 0)
			.collect();
		rpc_urls.sort_by(|a, b| b.weight.cmp(&a.weight));

		let base_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(32)
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.context("Failed to create base HTTP client")?;

		let retryable_client = create_retryable_http_client(
			&network.rpc_retry,
			base_client,
			Some(TransientErrorRetryStrategy),
		);

		let payload = match &test_connection_payload {
			Some(payload) => {
				serde_json::from_str(payload).context("Failed to parse test payload as JSON")?
			}
			None => default_test_payload(),
		};

		for rpc_url in rpc_urls.iter() {
			let Ok(url) = Url::parse(rpc_url.url.as_ref()) else {
				continue;
			};

			match retryable_client.post(url).json(&payload).send().await {
				Ok(response) if response.status().is_success() => {
					let fallback_urls: Vec<String> = rpc_urls
						.iter()
						.filter(|other| other.url != rpc_url.url)
						.map(|other| other.url.as_ref().to_string())
						.collect();

					tracing::debug!(
						"Connected to {} for network {}",
						rpc_url.url.as_ref(),
						network.slug
					);

					return Ok(Self {
						client: retryable_client.clone(),
						endpoint_manager: EndpointManager::new(
							retryable_client,
							rpc_url.url.as_ref(),
							fallback_urls,
						),
						test_connection_payload,
					});
				}
				_ => continue,
			}
		}

		Err(anyhow::anyhow!(
			"All RPC URLs failed to connect for network {}",
			network.slug
		))
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error> {
		self.endpoint_manager.update_client(client);
		Ok(())
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		let url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;

		let payload = match &self.test_connection_payload {
			Some(payload) => {
				serde_json::from_str(payload).context("Failed to parse test payload as JSON")?
			}
			None => default_test_payload(),
		};

		let response = self
			.client
			.post(url.clone())
			.json(&payload)
			.send()
			.await
			.map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(anyhow::anyhow!(
				"Failed to connect to {}: {}",
				url,
				response.status().as_u16()
			))
		}
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed_url = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		let mut active_url = self.endpoint_manager.active_url.write().await;
		*active_url = parsed_url.as_str().trim_end_matches('/').to_string();
		Ok(())
	}
}
