use lazy_static::lazy_static;
use std::sync::Mutex;
use std::{env, fs};
use tempfile::TempDir;
use zeroize::Zeroize;

use charged_token_indexer::models::{RpcUrl, SecretString, SecretValue};
use charged_token_indexer::repositories::{NetworkRepository, NetworkRepositoryTrait};
use charged_token_indexer::utils::tests::builders::network::NetworkBuilder;

lazy_static! {
	// Tests below touch process-wide environment variables
	static ref TEST_LOCK: Mutex<()> = Mutex::new(());
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_secret_resolution_from_network_config() {
	let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let temp_dir = TempDir::new().unwrap();
	let config_path = temp_dir.path().join("amoy.json");

	const RPC_URL_ENV: &str = "CHARGED_TEST_RPC_URL";
	const RPC_URL_VALUE: &str = "https://test-rpc.example.com/v1/api-key";
	env::set_var(RPC_URL_ENV, RPC_URL_VALUE);

	let mut network = NetworkBuilder::new()
		.name("Polygon Amoy")
		.slug("polygon_amoy")
		.chain_id(80002)
		.block_time_ms(2000)
		.cron_schedule("*/2 * * * * *")
		.rpc_url("https://rpc-amoy.polygon.technology")
		.build();
	network.rpc_urls.push(RpcUrl {
		type_: "rpc".to_string(),
		url: SecretValue::Environment(RPC_URL_ENV.to_string()),
		weight: 90,
	});

	fs::write(&config_path, serde_json::to_string_pretty(&network).unwrap()).unwrap();

	let repository = NetworkRepository::load_all(Some(temp_dir.path()))
		.await
		.unwrap();
	let loaded_network = repository.get("amoy").unwrap();

	let plain_rpc = loaded_network.rpc_urls[0].url.resolve().await.unwrap();
	assert_eq!(plain_rpc.as_str(), "https://rpc-amoy.polygon.technology");

	// Environment references are replaced by their value while loading
	assert_eq!(
		loaded_network.rpc_urls[1].url,
		SecretValue::Plain(SecretString::new(RPC_URL_VALUE.to_string()))
	);

	env::remove_var(RPC_URL_ENV);
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_missing_environment_secret_fails_loading() {
	let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let temp_dir = TempDir::new().unwrap();
	const RPC_URL_ENV: &str = "CHARGED_TEST_MISSING_RPC_URL";
	env::remove_var(RPC_URL_ENV);

	let mut network = NetworkBuilder::new().slug("sepolia").build();
	network.rpc_urls = vec![RpcUrl {
		type_: "rpc".to_string(),
		url: SecretValue::Environment(RPC_URL_ENV.to_string()),
		weight: 100,
	}];
	fs::write(
		temp_dir.path().join("sepolia.json"),
		serde_json::to_string(&network).unwrap(),
	)
	.unwrap();

	let result = NetworkRepository::new(Some(temp_dir.path())).await;
	assert!(result.is_err());
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_secret_zeroization() {
	let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let mut secret = SecretValue::Plain(SecretString::new("sensitive_data".to_string()));

	let resolved = secret.resolve().await.unwrap();
	assert_eq!(resolved.as_str(), "sensitive_data");

	secret.zeroize();

	if let SecretValue::Plain(ref secret_string) = secret {
		assert_eq!(secret_string.as_str(), "");
	}

	let mut reference = SecretValue::Environment("CHARGED_TEST_RPC_URL".to_string());
	reference.zeroize();
	assert!(reference.is_empty());
}

#[tokio::test]
async fn test_secret_serialization_deserialization() {
	let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

	let plain_secret = SecretValue::Plain(SecretString::new("test_plain".to_string()));
	let env_secret = SecretValue::Environment("TEST_ENV_VAR".to_string());

	let plain_json = serde_json::to_string(&plain_secret).unwrap();
	let env_json = serde_json::to_string(&env_secret).unwrap();

	let deserialized_plain: SecretValue = serde_json::from_str(&plain_json).unwrap();
	let deserialized_env: SecretValue = serde_json::from_str(&env_json).unwrap();

	assert_eq!(deserialized_plain, plain_secret);
	assert_eq!(deserialized_env, env_secret);

	// Type tags are matched case-insensitively
	let lowercase: SecretValue =
		serde_json::from_str(r#"{"type": "environment", "value": "TEST_ENV_VAR"}"#).unwrap();
	assert_eq!(lowercase, env_secret);
}
