use charged_token_indexer::services::blockchain::{BlockChainError, ClientPool, ClientPoolTrait};
use std::sync::Arc;

use crate::integration::mocks::{
	create_evm_test_network_with_urls, create_evm_valid_server_mock_network_response,
};

#[tokio::test]
async fn test_get_client_caches_per_network() {
	let mut server = mockito::Server::new_async().await;
	let mock = create_evm_valid_server_mock_network_response(&mut server);
	let network = create_evm_test_network_with_urls(vec![&server.url()]);

	let pool = ClientPool::new();
	assert_eq!(pool.client_count().await, 0);

	let first = pool.get_client(&network).await.unwrap();
	let second = pool.get_client(&network).await.unwrap();

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(pool.client_count().await, 1);
	mock.assert();
}

#[tokio::test]
async fn test_get_client_concurrently() {
	let mut server = mockito::Server::new_async().await;
	let mock = create_evm_valid_server_mock_network_response(&mut server);
	let network = create_evm_test_network_with_urls(vec![&server.url()]);
	let pool = Arc::new(ClientPool::new());

	let handles: Vec<_> = (0..5)
		.map(|_| {
			let pool = pool.clone();
			let network = network.clone();
			tokio::spawn(async move { pool.get_client(&network).await })
		})
		.collect();

	let clients: Vec<_> = futures::future::join_all(handles)
		.await
		.into_iter()
		.map(|joined| joined.unwrap().unwrap())
		.collect();

	for client in &clients[1..] {
		assert!(Arc::ptr_eq(&clients[0], client));
	}
	assert_eq!(pool.client_count().await, 1);
	mock.assert();
}

#[tokio::test]
async fn test_get_client_with_unreachable_network() {
	let network = create_evm_test_network_with_urls(vec!["invalid-url"]);
	let pool = ClientPool::new();

	let error = pool.get_client(&network).await.unwrap_err();

	assert!(matches!(error, BlockChainError::ClientPoolError(_)));
	assert!(error.to_string().contains("Failed to create chain client"));
	assert_eq!(pool.client_count().await, 0);
}
