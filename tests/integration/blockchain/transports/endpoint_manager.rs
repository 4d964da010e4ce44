use mockito::Server;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use charged_token_indexer::services::blockchain::{
	BlockchainTransport, EndpointManager, TransportError,
};

use crate::integration::mocks::{AlwaysFailsToUpdateClientTransport, MockTransport};

fn get_mock_client_builder() -> ClientWithMiddleware {
	ClientBuilder::new(reqwest::Client::new()).build()
}

#[tokio::test]
async fn test_endpoint_rotation() {
	let server1 = Server::new_async().await;
	let mut server2 = Server::new_async().await;
	let server3 = Server::new_async().await;

	let mock2 = server2
		.mock("GET", "/")
		.with_status(200)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		server1.url().as_ref(),
		vec![server2.url(), server3.url()],
	);
	let transport = MockTransport::new();

	let new_url = manager.try_rotate_url(&transport).await.unwrap();

	assert_eq!(new_url, server2.url());
	assert_eq!(&*manager.active_url.read().await, &server2.url());
	// The previous URL goes to the back of the fallbacks
	assert_eq!(
		&*manager.fallback_urls.read().await,
		&vec![server3.url(), server1.url()]
	);
	assert_eq!(transport.get_current_url().await, server2.url());
	mock2.assert();
}

#[tokio::test]
async fn test_send_raw_request() {
	let mut server = Server::new_async().await;

	let mock = server
		.mock("POST", "/")
		.match_body(mockito::Matcher::Json(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_getLogs",
			"params": [{"fromBlock": "0x1"}]
		})))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"jsonrpc": "2.0", "result": [], "id": 1}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(get_mock_client_builder(), server.url().as_ref(), vec![]);
	let transport = MockTransport::new();

	let result = manager
		.send_raw_request(&transport, "eth_getLogs", Some(json!([{"fromBlock": "0x1"}])))
		.await
		.unwrap();

	assert_eq!(result["result"], json!([]));
	mock.assert();
}

#[tokio::test]
async fn test_rotation_on_rate_limit() {
	let mut primary_server = Server::new_async().await;
	let mut fallback_server = Server::new_async().await;

	let primary_mock = primary_server
		.mock("POST", "/")
		.with_status(429)
		.with_body("Rate limited")
		.expect(1)
		.create_async()
		.await;

	let fallback_mock = fallback_server
		.mock("POST", "/")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"jsonrpc": "2.0", "result": "0x10", "id": 1}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		primary_server.url().as_ref(),
		vec![fallback_server.url()],
	);
	let transport = MockTransport::new();

	let result = manager
		.send_raw_request::<_, Value>(&transport, "eth_blockNumber", None)
		.await
		.unwrap();

	assert_eq!(result["result"], "0x10");
	assert_eq!(&*manager.active_url.read().await, &fallback_server.url());
	primary_mock.assert();
	fallback_mock.assert();
}

#[tokio::test]
async fn test_rotation_on_network_error() {
	let mut fallback_server = Server::new_async().await;

	let fallback_mock = fallback_server
		.mock("POST", "/")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(r#"{"jsonrpc": "2.0", "result": "0x10", "id": 1}"#)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		"http://127.0.0.1:1",
		vec![fallback_server.url()],
	);
	let transport = MockTransport::new();

	let result = manager
		.send_raw_request::<_, Value>(&transport, "eth_blockNumber", None)
		.await
		.unwrap();

	assert_eq!(result["result"], "0x10");
	assert_eq!(&*manager.active_url.read().await, &fallback_server.url());
	fallback_mock.assert();
}

#[tokio::test]
async fn test_no_fallback_urls_available() {
	let mut server = Server::new_async().await;

	let mock = server
		.mock("POST", "/")
		.with_status(429)
		.with_body("Rate limited")
		.expect(1)
		.create_async()
		.await;

	let manager = EndpointManager::new(get_mock_client_builder(), server.url().as_ref(), vec![]);
	let transport = MockTransport::new();

	let error = manager
		.send_raw_request(&transport, "eth_blockNumber", Some(json!([])))
		.await
		.unwrap_err();

	match error {
		TransportError::Http {
			status_code,
			url,
			body,
			..
		} => {
			assert_eq!(status_code, 429);
			assert_eq!(url, server.url());
			assert_eq!(body, "Rate limited");
		}
		other => panic!("Expected Http error with status code 429, got {:?}", other),
	}
	mock.assert();
}

#[tokio::test]
async fn test_non_rotating_status_is_returned() {
	let mut primary_server = Server::new_async().await;
	let fallback_server = Server::new_async().await;

	let mock = primary_server
		.mock("POST", "/")
		.with_status(400)
		.with_body("Bad request")
		.expect(1)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		primary_server.url().as_ref(),
		vec![fallback_server.url()],
	);
	let transport = MockTransport::new();

	let error = manager
		.send_raw_request(&transport, "eth_blockNumber", Some(json!([])))
		.await
		.unwrap_err();

	assert!(matches!(error, TransportError::Http { status_code, .. } if status_code == 400));
	assert_eq!(&*manager.active_url.read().await, &primary_server.url());
	mock.assert();
}

#[tokio::test]
async fn test_rpc_error_does_not_rotate() {
	let mut primary_server = Server::new_async().await;
	let fallback_server = Server::new_async().await;

	let mock = primary_server
		.mock("POST", "/")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(
			r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "header not found"}}"#,
		)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		primary_server.url().as_ref(),
		vec![fallback_server.url()],
	);
	let transport = MockTransport::new();

	let error = manager
		.send_raw_request(&transport, "eth_getLogs", Some(json!([])))
		.await
		.unwrap_err();

	match error {
		TransportError::Rpc { code, context } => {
			assert_eq!(code, -32000);
			assert_eq!(context.message, "header not found");
		}
		other => panic!("Expected an RPC error, got {:?}", other),
	}
	assert_eq!(&*manager.active_url.read().await, &primary_server.url());
	mock.assert();
}

#[tokio::test]
async fn test_customize_request() {
	let transport = MockTransport::new();

	let result = transport
		.customize_request("eth_getBlockByNumber", Some(json!(["0x1", false])))
		.await;

	assert_eq!(
		result,
		json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_getBlockByNumber",
			"params": ["0x1", false]
		})
	);

	let result = transport
		.customize_request::<Value>("eth_blockNumber", None)
		.await;

	assert_eq!(
		result,
		json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_blockNumber",
			"params": null
		})
	);
}

#[tokio::test]
async fn test_rotate_url_no_fallbacks() {
	let server = Server::new_async().await;

	let manager = EndpointManager::new(get_mock_client_builder(), server.url().as_ref(), vec![]);
	let transport = MockTransport::new();

	let error = manager.try_rotate_url(&transport).await.unwrap_err();

	assert!(matches!(error, TransportError::UrlRotation(_)));
	assert_eq!(&*manager.active_url.read().await, &server.url());
}

#[tokio::test]
async fn test_rotate_url_update_client_fails() {
	let server1 = Server::new_async().await;
	let server2 = Server::new_async().await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		server1.url().as_ref(),
		vec![server2.url()],
	);
	let transport = AlwaysFailsToUpdateClientTransport {
		current_url: Arc::new(RwLock::new(server1.url())),
	};

	let error = manager.try_rotate_url(&transport).await.unwrap_err();

	assert!(error
		.to_string()
		.contains("Failed to update transport client with new URL"));
	assert_eq!(&*manager.active_url.read().await, &server1.url());
	assert_eq!(&*manager.fallback_urls.read().await, &vec![server2.url()]);
}

#[tokio::test]
async fn test_send_raw_request_when_rotation_fails() {
	let mut server1 = Server::new_async().await;
	let server2 = Server::new_async().await;

	let mock = server1
		.mock("POST", "/")
		.with_status(429)
		.with_body("Rate limited")
		.expect(1)
		.create_async()
		.await;

	let manager = EndpointManager::new(
		get_mock_client_builder(),
		server1.url().as_ref(),
		vec![server2.url()],
	);
	let transport = AlwaysFailsToUpdateClientTransport {
		current_url: Arc::new(RwLock::new(server1.url())),
	};

	let error = manager
		.send_raw_request::<_, Value>(&transport, "eth_blockNumber", None)
		.await
		.unwrap_err();

	match error {
		TransportError::Http { status_code, context, .. } => {
			assert_eq!(status_code, 429);
			assert!(context.source.is_some());
		}
		other => panic!("Expected Http error, got {:?}", other),
	}
	mock.assert();
}
