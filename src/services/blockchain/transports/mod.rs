//! JSON-RPC transports used by the chain client.

mod endpoint_manager;
mod error;
mod http;

pub use endpoint_manager::EndpointManager;
pub use error::TransportError;
pub use http::HttpTransportClient;

use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{
	default_on_request_failure, default_on_request_success, Retryable, RetryableStrategy,
};
use serde::Serialize;
use serde_json::{json, Value};

/// HTTP statuses that make the endpoint manager switch to a fallback URL
/// (429: rate limited).
pub const ROTATE_ON_ERROR_CODES: [u16; 1] = [429];

/// A JSON-RPC capable transport.
#[async_trait::async_trait]
pub trait BlockchainTransport: Send + Sync {
	async fn get_current_url(&self) -> String;

	/// Sends `method` with `params` and returns the whole response body
	async fn send_raw_request<P>(
		&self,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError>
	where
		P: Into<Value> + Send + Clone + Serialize;

	/// Builds the request body; JSON-RPC 2.0 unless overridden
	async fn customize_request<P>(&self, method: &str, params: Option<P>) -> Value
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params.map(|p| p.into())
		})
	}

	fn update_endpoint_manager_client(
		&mut self,
		client: ClientWithMiddleware,
	) -> Result<(), anyhow::Error>;
}

/// Transports able to move to another endpoint
#[async_trait::async_trait]
pub trait RotatingTransport: BlockchainTransport {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error>;

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error>;
}

/// Retries on whatever `reqwest-retry` considers transient.
pub struct TransientErrorRetryStrategy;
impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}
