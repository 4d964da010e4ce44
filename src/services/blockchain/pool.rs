//! Per-network cache of chain clients.
//!
//! A client is created on first use and shared afterwards. Lookups take the
//! read lock; creation re-checks under the write lock so that concurrent
//! callers end up with the same client.

use crate::{
	models::Network,
	services::blockchain::{BlockChainError, ChainClient, EvmClient, HttpTransportClient},
	utils::client_storage::ClientStorage,
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

#[async_trait]
pub trait ClientPoolTrait: Send + Sync {
	type Client: ChainClient + 'static;

	async fn get_client(&self, network: &Network) -> Result<Arc<Self::Client>, BlockChainError>;
}

pub struct ClientPool {
	storage: ClientStorage<EvmClient<HttpTransportClient>>,
}

impl ClientPool {
	pub fn new() -> Self {
		Self {
			storage: ClientStorage::new(),
		}
	}

	pub async fn client_count(&self) -> usize {
		self.storage.clients.read().await.len()
	}
}

#[async_trait]
impl ClientPoolTrait for ClientPool {
	type Client = EvmClient<HttpTransportClient>;

	async fn get_client(&self, network: &Network) -> Result<Arc<Self::Client>, BlockChainError> {
		if let Some(client) = self.storage.clients.read().await.get(&network.slug) {
			return Ok(client.clone());
		}

		let mut clients = self.storage.clients.write().await;
		if let Some(client) = clients.get(&network.slug) {
			return Ok(client.clone());
		}

		let client = EvmClient::new(network).await.map_err(|e| {
			BlockChainError::client_pool_error(
				"Failed to create chain client",
				Some(e.into()),
				Some(HashMap::from([(
					"network".to_string(),
					network.slug.clone(),
				)])),
			)
		})?;
		let client = Arc::new(client);
		clients.insert(network.slug.clone(), client.clone());
		Ok(client)
	}
}

impl Default for ClientPool {
	fn default() -> Self {
		Self::new()
	}
}
