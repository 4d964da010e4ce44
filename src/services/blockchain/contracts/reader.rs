//! View calls and full snapshot loads.
//!
//! A handle reads the latest block unless pinned with
//! [`ContractHandle::at_block`]. Snapshot loads are always pinned to the block
//! they are stamped with, so the events of later blocks are not already
//! folded into the loaded state.

use alloy::{
	dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
	primitives::{Address, U256},
};
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};

use crate::{
	models::{format_address, ContractKind, ContractSnapshot, Delta},
	services::{
		blockchain::{contracts::ContractInterface, ChainClient},
		indexer::IndexerError,
	},
};

const CHARGED_TOKEN_FIELDS: &[&str] = &[
	"owner",
	"name",
	"symbol",
	"decimals",
	"totalSupply",
	"fractionInitialUnlockPerThousand",
	"durationCliff",
	"durationLinearVesting",
	"maxInitialTokenAllocation",
	"maxWithdrawFeesPerThousandForLT",
	"maxClaimFeesPerThousandForPT",
	"maxStakingAPR",
	"maxStakingTokenAmount",
	"stakingStartDate",
	"stakingDuration",
	"stakingDateLastCheckpoint",
	"campaignStakingRewards",
	"totalStakingRewards",
	"areUserFunctionsDisabled",
	"isInterfaceProjectTokenLocked",
	"areAllocationsTerminated",
	"withdrawFeesPerThousandForLT",
	"ratioFeesToRewardHodlersPerThousand",
	"currentRewardPerShare1e18",
	"stakedLT",
	"totalTokenAllocated",
	"interfaceProjectToken",
];

const FUNDRAISING_FIELDS: &[&str] = &[
	"isFundraisingActive",
	"fundraisingToken",
	"fundraisingTokenSymbol",
	"priceTokenPer1e18",
	"fundraisingFeesPerThousand",
];

const INTERFACE_PROJECT_TOKEN_FIELDS: &[&str] = &[
	"owner",
	"liquidityToken",
	"projectToken",
	"dateLaunch",
	"dateEndCliff",
	"claimFeesPerThousandForPT",
];

const DELEGABLE_TO_LT_FIELDS: &[&str] = &[
	"owner",
	"name",
	"symbol",
	"decimals",
	"totalSupply",
	"isListOfInterfaceProjectTokenComplete",
];

/// Per-user record of a ChargedToken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquiTokenRecord {
	pub fully_charged_balance: String,
	pub partially_charged_balance: String,
	pub date_of_partially_charged: String,
	pub claimed_reward_per_share_1e18: String,
}

/// Live handle on one deployed contract
#[derive(Clone)]
pub struct ContractHandle {
	interface: ContractInterface,
	address: Address,
	client: Arc<dyn ChainClient>,
	block: Option<u64>,
}

/// Converts a view output to its stored JSON form
fn to_json(value: &DynSolValue) -> Value {
	match value {
		DynSolValue::Address(address) => Value::String(format_address(address)),
		DynSolValue::Bool(flag) => Value::Bool(*flag),
		DynSolValue::Uint(number, _) => Value::String(number.to_string()),
		DynSolValue::Int(number, _) => Value::String(number.to_string()),
		DynSolValue::String(text) => Value::String(text.clone()),
		other => Value::String(crate::services::blockchain::contracts::format_value(other)),
	}
}

impl ContractHandle {
	pub fn new(kind: ContractKind, address: Address, client: Arc<dyn ChainClient>) -> Self {
		Self {
			interface: ContractInterface::new(kind),
			address,
			client,
			block: None,
		}
	}

	/// Same contract, read as of block `block_number`
	pub fn at_block(mut self, block_number: u64) -> Self {
		self.block = Some(block_number);
		self
	}

	/// Block the reads are pinned to, `None` for the latest
	pub fn block(&self) -> Option<u64> {
		self.block
	}

	pub fn kind(&self) -> ContractKind {
		self.interface.kind()
	}

	pub fn address(&self) -> Address {
		self.address
	}

	fn metadata(&self, function: &str) -> HashMap<String, String> {
		HashMap::from([
			("contract".to_string(), format_address(&self.address)),
			("kind".to_string(), self.kind().to_string()),
			("function".to_string(), function.to_string()),
		])
	}

	/// Calls a view function and returns its decoded outputs
	pub async fn call_function(
		&self,
		name: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, IndexerError> {
		let function = self.interface.function(name)?;
		let calldata = function.abi_encode_input(args).map_err(|e| {
			IndexerError::decode_error(
				"Failed to encode call",
				Some(Box::new(e)),
				Some(self.metadata(name)),
			)
		})?;

		let output = self
			.client
			.call(self.address, calldata.into(), self.block)
			.await
			.map_err(|e| {
				IndexerError::chain_error("View call failed", Some(e.into()), Some(self.metadata(name)))
			})?;

		function.abi_decode_output(&output).map_err(|e| {
			IndexerError::decode_error(
				"Failed to decode call output",
				Some(Box::new(e)),
				Some(self.metadata(name)),
			)
		})
	}

	async fn read_value(&self, name: &str, args: &[DynSolValue]) -> Result<DynSolValue, IndexerError> {
		self.call_function(name, args)
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| {
				IndexerError::decode_error("Empty call output", None, Some(self.metadata(name)))
			})
	}

	pub async fn read_address(&self, name: &str, args: &[DynSolValue]) -> Result<Address, IndexerError> {
		let value = self.read_value(name, args).await?;
		value.as_address().ok_or_else(|| {
			IndexerError::decode_error("Expected an address", None, Some(self.metadata(name)))
		})
	}

	pub async fn read_uint(&self, name: &str, args: &[DynSolValue]) -> Result<U256, IndexerError> {
		let value = self.read_value(name, args).await?;
		value.as_uint().map(|(number, _)| number).ok_or_else(|| {
			IndexerError::decode_error("Expected an integer", None, Some(self.metadata(name)))
		})
	}

	pub async fn read_amount(&self, name: &str, args: &[DynSolValue]) -> Result<String, IndexerError> {
		Ok(self.read_uint(name, args).await?.to_string())
	}

	pub async fn read_bool(&self, name: &str) -> Result<bool, IndexerError> {
		let value = self.read_value(name, &[]).await?;
		value.as_bool().ok_or_else(|| {
			IndexerError::decode_error("Expected a boolean", None, Some(self.metadata(name)))
		})
	}

	pub async fn read_string(&self, name: &str, args: &[DynSolValue]) -> Result<String, IndexerError> {
		let value = self.read_value(name, args).await?;
		value.as_str().map(str::to_string).ok_or_else(|| {
			IndexerError::decode_error("Expected a string", None, Some(self.metadata(name)))
		})
	}

	/// Reads argument-less getters whose names match document fields
	async fn read_fields(&self, names: &[&str]) -> Result<Delta, IndexerError> {
		let values = try_join_all(names.iter().map(|name| self.read_value(name, &[]))).await?;
		let mut delta = Delta::new();
		for (name, value) in names.iter().zip(values.iter()) {
			delta.set(name, to_json(value));
		}
		Ok(delta)
	}

	/// Reads `count_fn` then `get_fn(i)` for every index
	async fn read_list(&self, count_fn: &str, get_fn: &str) -> Result<Vec<Address>, IndexerError> {
		let count = self.read_uint(count_fn, &[]).await?;
		let count: u64 = count.try_into().map_err(|_| {
			IndexerError::decode_error("List length out of range", None, Some(self.metadata(count_fn)))
		})?;

		try_join_all((0..count).map(|index| async move {
			self.read_address(get_fn, &[DynSolValue::Uint(U256::from(index), 256)])
				.await
		}))
		.await
	}

	pub async fn balance_of(&self, user: Address) -> Result<String, IndexerError> {
		self.read_amount("balanceOf", &[DynSolValue::Address(user)]).await
	}

	pub async fn user_liqui_token(&self, user: Address) -> Result<LiquiTokenRecord, IndexerError> {
		let outputs = self
			.call_function("userLiquiToken", &[DynSolValue::Address(user)])
			.await?;
		let amount = |index: usize| -> Result<String, IndexerError> {
			outputs
				.get(index)
				.and_then(DynSolValue::as_uint)
				.map(|(number, _)| number.to_string())
				.ok_or_else(|| {
					IndexerError::decode_error(
						"Malformed userLiquiToken output",
						None,
						Some(self.metadata("userLiquiToken")),
					)
				})
		};

		Ok(LiquiTokenRecord {
			fully_charged_balance: amount(0)?,
			partially_charged_balance: amount(1)?,
			date_of_partially_charged: amount(2)?,
			claimed_reward_per_share_1e18: amount(3)?,
		})
	}

	pub async fn value_project_token_to_full_recharge(
		&self,
		user: Address,
	) -> Result<String, IndexerError> {
		self.read_amount("valueProjectTokenToFullRecharge", &[DynSolValue::Address(user)])
			.await
	}

	/// Reads the complete state of the contract as of `block_number`
	pub async fn load_snapshot(
		&self,
		chain_id: u64,
		block_number: u64,
	) -> Result<ContractSnapshot, IndexerError> {
		let pinned = self.clone().at_block(block_number);
		let mut delta = match self.kind() {
			ContractKind::Directory => pinned.load_directory().await?,
			ContractKind::ChargedToken => pinned.load_charged_token().await?,
			ContractKind::InterfaceProjectToken => {
				pinned.read_fields(INTERFACE_PROJECT_TOKEN_FIELDS).await?
			}
			ContractKind::DelegableToLT => pinned.load_delegable_to_lt().await?,
		};
		delta.set("lastUpdateBlock", block_number);

		Ok(ContractSnapshot::empty(self.kind(), chain_id, self.address).merge(&delta)?)
	}

	async fn load_directory(&self) -> Result<Delta, IndexerError> {
		let mut delta = self
			.read_fields(&["owner", "areUserFunctionsDisabled"])
			.await?;

		let contracts = self.read_list("countLTContracts", "getLTContract").await?;
		let owners = self
			.read_list("countWhitelistedProjectOwners", "getWhitelistedProjectOwner")
			.await?;

		let owner_names = try_join_all(owners.iter().map(|owner| async move {
			self.read_string("whitelist", &[DynSolValue::Address(*owner)])
				.await
		}))
		.await?;
		let contract_projects = try_join_all(contracts.iter().map(|contract| async move {
			self.read_string("projectRelatedToLT", &[DynSolValue::Address(*contract)])
				.await
		}))
		.await?;

		let mut projects: Vec<String> = Vec::new();
		for name in &owner_names {
			if !name.is_empty() && !projects.contains(name) {
				projects.push(name.clone());
			}
		}

		let whitelist: serde_json::Map<String, Value> = owners
			.iter()
			.zip(owner_names)
			.map(|(owner, name)| (format_address(owner), Value::String(name)))
			.collect();
		let related: serde_json::Map<String, Value> = contracts
			.iter()
			.zip(contract_projects)
			.filter(|(_, name)| !name.is_empty())
			.map(|(contract, name)| (format_address(contract), Value::String(name)))
			.collect();

		delta.set(
			"directory",
			contracts.iter().map(format_address).collect::<Vec<_>>(),
		);
		delta.set(
			"whitelistedProjectOwners",
			owners.iter().map(format_address).collect::<Vec<_>>(),
		);
		delta.set("projects", projects);
		delta.set("whitelist", Value::Object(whitelist));
		delta.set("projectRelatedToLT", Value::Object(related));
		Ok(delta)
	}

	async fn load_charged_token(&self) -> Result<Delta, IndexerError> {
		let mut delta = self.read_fields(CHARGED_TOKEN_FIELDS).await?;
		delta.set("totalLocked", self.balance_of(self.address).await?);

		// Plain ChargedTokens do not implement the fundraising getters.
		let is_fundraising = self
			.read_bool("isFundraisingContract")
			.await
			.unwrap_or(false);
		if is_fundraising {
			let fundraising = self.read_fields(FUNDRAISING_FIELDS).await?;
			delta.set("fundraising", json!(fundraising));
		}
		Ok(delta)
	}

	async fn load_delegable_to_lt(&self) -> Result<Delta, IndexerError> {
		let mut delta = self.read_fields(DELEGABLE_TO_LT_FIELDS).await?;
		let validated = self
			.read_list(
				"countValidatedInterfaceProjectToken",
				"getValidatedInterfaceProjectToken",
			)
			.await?;
		delta.set(
			"validatedInterfaceProjectToken",
			validated.iter().map(format_address).collect::<Vec<_>>(),
		);
		Ok(delta)
	}
}
