//! Active RPC endpoint selection with fallback rotation.
//!
//! Requests go to the active URL. A network failure, or one of the
//! statuses in [`ROTATE_ON_ERROR_CODES`], rotates to the next fallback
//! and retries there until no fallback is left.
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::services::blockchain::transports::{
	RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES,
};

#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

/// Result of a single attempt against one URL
#[derive(Debug)]
enum AttemptOutcome {
	/// A response arrived; its status may still be an error
	Response(reqwest::Response),
	NetworkError(reqwest_middleware::Error),
	SerializationError(TransportError),
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			rotation_lock: Arc::new(Mutex::new(())),
			client,
		}
	}

	/// Replaces the HTTP client, e.g. to install a different retry policy
	pub fn update_client(&mut self, client: ClientWithMiddleware) {
		self.client = client;
	}

	/// Switches the active URL to the first reachable fallback.
	///
	/// The previously active URL is pushed to the back of the fallback list.
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let current = self.active_url.read().await.clone();
		let fallbacks = self.fallback_urls.read().await.clone();

		let Some(new_url) = fallbacks.iter().find(|url| **url != current).cloned() else {
			return Err(TransportError::url_rotation(
				format!("No fallback URLs available. Current active: '{}'", current),
				None,
				None,
			));
		};

		tracing::debug!("Rotating RPC endpoint from '{}' to '{}'", current, new_url);

		transport.try_connect(&new_url).await.map_err(|e| {
			TransportError::url_rotation(
				format!("Failed to connect to new URL '{}'", new_url),
				Some(e.into()),
				None,
			)
		})?;
		transport.update_client(&new_url).await.map_err(|e| {
			TransportError::url_rotation(
				format!("Failed to update transport client with new URL '{}'", new_url),
				Some(e.into()),
				None,
			)
		})?;

		let mut active_guard = self.active_url.write().await;
		let mut fallback_guard = self.fallback_urls.write().await;
		let mut next: Vec<String> = fallback_guard
			.iter()
			.filter(|url| **url != new_url)
			.cloned()
			.collect();
		next.push(current);
		*fallback_guard = next;
		*active_guard = new_url.clone();

		Ok(new_url)
	}

	async fn try_request_on_url<P>(
		&self,
		url: &str,
		transport: &impl RotatingTransport,
		method: &str,
		params: Option<P>,
	) -> AttemptOutcome
	where
		P: Into<Value> + Send + Clone + Serialize,
	{
		let request_body = transport.customize_request(method, params).await;
		let body = match serde_json::to_string(&request_body) {
			Ok(body) => body,
			Err(e) => {
				return AttemptOutcome::SerializationError(TransportError::request_serialization(
					"Failed to serialize request JSON",
					Some(Box::new(e)),
					None,
				));
			}
		};

		match self
			.client
			.post(url)
			.header("Content-Type", "application/json")
			.body(body)
			.send()
			.await
		{
			Ok(response) => AttemptOutcome::Response(response),
			Err(e) => AttemptOutcome::NetworkError(e),
		}
	}

	/// Sends a JSON-RPC request, rotating endpoints on transport failures.
	///
	/// A body carrying a JSON-RPC `error` object is returned as
	/// [`TransportError::Rpc`] without rotating: the node is reachable and
	/// answered, it just refused this request.
	pub async fn send_raw_request<
		T: RotatingTransport,
		P: Into<Value> + Send + Clone + Serialize,
	>(
		&self,
		transport: &T,
		method: &str,
		params: Option<P>,
	) -> Result<Value, TransportError> {
		loop {
			let url = self.active_url.read().await.clone();

			match self
				.try_request_on_url(&url, transport, method, params.clone())
				.await
			{
				AttemptOutcome::Response(response) => {
					let status = response.status();
					if status.is_success() {
						let body: Value = response.json().await.map_err(|e| {
							TransportError::response_parse(
								"Failed to parse JSON response",
								Some(Box::new(e)),
								None,
							)
						})?;
						return match body.get("error") {
							Some(error) if !error.is_null() => Err(rpc_error(method, &url, error)),
							_ => Ok(body),
						};
					}

					let error_body = response.text().await.unwrap_or_default();
					tracing::warn!(
						"Request to {} failed with status {}: {}",
						url,
						status,
						error_body
					);

					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) {
						return Err(TransportError::http(status, url, error_body, None, None));
					}
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::http(
							status,
							url,
							error_body,
							Some(Box::new(rotation_error)),
							None,
						));
					}
				}
				AttemptOutcome::NetworkError(network_error) => {
					tracing::warn!("Network error for {}: {}", url, network_error);
					if let Err(rotation_error) = self.try_rotate_url(transport).await {
						return Err(TransportError::network(
							network_error.to_string(),
							Some(Box::new(rotation_error)),
							None,
						));
					}
				}
				AttemptOutcome::SerializationError(e) => return Err(e),
			}
		}
	}
}

fn rpc_error(method: &str, url: &str, error: &Value) -> TransportError {
	let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
	let message = error
		.get("message")
		.and_then(Value::as_str)
		.map(str::to_string)
		.unwrap_or_else(|| error.to_string());
	TransportError::rpc(
		code,
		message,
		Some(HashMap::from([
			("method".to_string(), method.to_string()),
			("url".to_string(), url.to_string()),
		])),
	)
}
