use alloy::primitives::{Address, Bytes, B256};
use mockall::predicate;
use mockito::Server;
use serde_json::{json, Value};

use charged_token_indexer::services::blockchain::{ChainClient, EvmClient, TransportError};

use crate::integration::mocks::{
	create_evm_test_network_with_urls, create_evm_valid_server_mock_network_response,
	create_rpc_block, create_test_header, MockRpcTransport,
};

const TOKEN: Address = Address::with_last_byte(0xc1);

fn rpc_result(result: Value) -> Value {
	json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

#[tokio::test]
async fn test_get_latest_block_number() {
	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(predicate::eq("eth_blockNumber"), predicate::always())
		.times(1)
		.returning(|_, _| Ok(rpc_result(json!("0x1f4"))));

	let client = EvmClient::new_with_transport(transport);

	assert_eq!(client.get_latest_block_number().await.unwrap(), 500);
}

#[tokio::test]
async fn test_get_latest_block_number_invalid_response() {
	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(predicate::eq("eth_blockNumber"), predicate::always())
		.times(1)
		.returning(|_, _| Ok(json!({"jsonrpc": "2.0", "id": 1})));

	let client = EvmClient::new_with_transport(transport);
	let error = client.get_latest_block_number().await.unwrap_err();

	assert!(error.to_string().contains("Missing 'result' field"));
}

#[tokio::test]
async fn test_get_block() {
	let header = create_test_header(42, 0, 0);
	let block = create_rpc_block(&header);
	let expected_params = json!(["0x2a", false]);

	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(
			predicate::eq("eth_getBlockByNumber"),
			predicate::function(move |params: &Option<Value>| {
				params.as_ref() == Some(&expected_params)
			}),
		)
		.times(1)
		.returning(move |_, _| Ok(rpc_result(block.clone())));

	let client = EvmClient::new_with_transport(transport);

	assert_eq!(client.get_block(42).await.unwrap(), header);
}

#[tokio::test]
async fn test_get_unknown_block() {
	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(predicate::eq("eth_getBlockByNumber"), predicate::always())
		.times(1)
		.returning(|_, _| Ok(rpc_result(Value::Null)));

	let client = EvmClient::new_with_transport(transport);
	let error = client.get_block(1_000_000).await.unwrap_err();

	assert_eq!(error.to_string(), "Block not found: 1000000");
}

#[tokio::test]
async fn test_get_logs() {
	let tx_hash = B256::repeat_byte(0xab);
	let expected_params = json!([{
		"fromBlock": "0xa",
		"toBlock": "0x14",
		"address": [TOKEN]
	}]);

	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(
			predicate::eq("eth_getLogs"),
			predicate::function(move |params: &Option<Value>| {
				params.as_ref() == Some(&expected_params)
			}),
		)
		.times(1)
		.returning(move |_, _| {
			Ok(rpc_result(json!([{
				"address": TOKEN,
				"topics": [B256::repeat_byte(0x01)],
				"data": "0x",
				"blockHash": B256::repeat_byte(0x02),
				"blockNumber": "0xc",
				"transactionHash": tx_hash,
				"transactionIndex": "0x1",
				"logIndex": "0x3",
				"removed": false
			}])))
		});

	let client = EvmClient::new_with_transport(transport);
	let logs = client.get_logs(10, 20, Some(vec![TOKEN])).await.unwrap();

	assert_eq!(logs.len(), 1);
	assert_eq!(logs[0].address, TOKEN);
	assert_eq!(logs[0].transaction_hash, Some(tx_hash));
	let position = logs[0].position();
	assert_eq!(
		(position.block_number, position.tx_index, position.log_index),
		(12, 1, 3)
	);
}

#[tokio::test]
async fn test_get_logs_transport_failure() {
	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(predicate::eq("eth_getLogs"), predicate::always())
		.times(1)
		.returning(|_, _| {
			Err(TransportError::network(
				"connection reset",
				None,
				None,
			))
		});

	let client = EvmClient::new_with_transport(transport);
	let error = client.get_logs(1, 2, None).await.unwrap_err();

	assert!(error
		.to_string()
		.contains("Failed to get logs for blocks: 1 - 2"));
}

#[tokio::test]
async fn test_call() {
	let calldata = Bytes::from(vec![0x06, 0xfd, 0xde, 0x03]);
	let expected_params = json!([{ "to": TOKEN, "data": calldata.clone() }, "latest"]);

	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(
			predicate::eq("eth_call"),
			predicate::function(move |params: &Option<Value>| {
				params.as_ref() == Some(&expected_params)
			}),
		)
		.times(1)
		.returning(|_, _| Ok(rpc_result(json!("0x0102"))));

	let client = EvmClient::new_with_transport(transport);
	let output = client.call(TOKEN, calldata, None).await.unwrap();

	assert_eq!(output, Bytes::from(vec![0x01, 0x02]));
}

#[tokio::test]
async fn test_call_pinned_to_a_block() {
	let calldata = Bytes::from(vec![0x18, 0x16, 0x0d, 0xdd]);
	let expected_params = json!([{ "to": TOKEN, "data": calldata.clone() }, "0x66"]);

	let mut transport = MockRpcTransport::new();
	transport
		.expect_send_raw_request()
		.with(
			predicate::eq("eth_call"),
			predicate::function(move |params: &Option<Value>| {
				params.as_ref() == Some(&expected_params)
			}),
		)
		.times(1)
		.returning(|_, _| Ok(rpc_result(json!("0x03e8"))));

	let client = EvmClient::new_with_transport(transport);
	let output = client.call(TOKEN, calldata, Some(102)).await.unwrap();

	assert_eq!(output, Bytes::from(vec![0x03, 0xe8]));
}

#[tokio::test]
async fn test_new_client_over_http() {
	let mut server = Server::new_async().await;
	let connection = create_evm_valid_server_mock_network_response(&mut server);
	let head = server
		.mock("POST", "/")
		.match_body(mockito::Matcher::PartialJson(
			json!({"method": "eth_blockNumber"}),
		))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x64"}"#)
		.create_async()
		.await;

	let network = create_evm_test_network_with_urls(vec![&server.url()]);
	let client = EvmClient::new(&network).await.unwrap();

	assert_eq!(client.get_latest_block_number().await.unwrap(), 100);
	connection.assert();
	head.assert();
}

#[tokio::test]
async fn test_new_client_without_reachable_endpoint() {
	let network = create_evm_test_network_with_urls(vec!["invalid-url"]);

	match EvmClient::new(&network).await {
		Err(error) => assert!(error.to_string().contains("All RPC URLs failed to connect")),
		Ok(_) => panic!("Client creation should fail"),
	}
}
