//! In-memory chain for tests
//!
//! - `FakeChainClient`: a [`ChainClient`] serving configured view outputs,
//!   logs and a linear chain of deterministic block headers. Views without a
//!   configured output answer with zero values of the declared output types.
//!   Outputs set with `set_output_from` only apply to reads at or after their
//!   block, unpinned reads are served at the head.

use alloy::{
	dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
	json_abi::Function,
	primitives::{Address, Bytes, FixedBytes, B256, I256, U256},
};
use async_trait::async_trait;
use std::{
	collections::{HashMap, HashSet},
	sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
	models::{BlockHeader, ChainLog, ContractKind},
	services::blockchain::{contracts::abi, ChainClient},
};

/// Timestamp of block 0
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

#[derive(Default)]
struct FakeChain {
	head: u64,
	/// Salt mixed into the hashes of blocks at or above a fork point
	forks: Vec<(u64, u8)>,
	logs: Vec<ChainLog>,
	/// Outputs matching the exact calldata
	exact_outputs: HashMap<(Address, Vec<u8>), Vec<DynSolValue>>,
	/// Outputs matching the selector only
	outputs: HashMap<(Address, FixedBytes<4>), Vec<DynSolValue>>,
	/// Selector outputs taking effect at a block
	history: HashMap<(Address, FixedBytes<4>), Vec<(u64, Vec<DynSolValue>)>>,
	reverts: HashSet<(Address, FixedBytes<4>)>,
	failing_ranges: Vec<(u64, String)>,
	calls: usize,
}

impl FakeChain {
	fn salt(&self, number: u64) -> u8 {
		self.forks
			.iter()
			.filter(|(from, _)| number >= *from)
			.map(|(_, salt)| *salt)
			.fold(0u8, |acc, salt| acc.wrapping_add(salt))
	}

	fn hash(&self, number: u64) -> B256 {
		let mut bytes = [0u8; 32];
		bytes[24..].copy_from_slice(&number.to_be_bytes());
		bytes[0] = self.salt(number);
		B256::from(bytes)
	}

	fn header(&self, number: u64) -> BlockHeader {
		BlockHeader {
			number,
			hash: self.hash(number),
			parent_hash: if number == 0 {
				B256::ZERO
			} else {
				self.hash(number - 1)
			},
			timestamp: GENESIS_TIMESTAMP + number * 2,
		}
	}
}

/// Chain double shared by unit and integration tests
#[derive(Default)]
pub struct FakeChainClient {
	chain: Mutex<FakeChain>,
}

fn find_function(kind: Option<ContractKind>, name: &str) -> Option<&'static Function> {
	let kinds: Vec<ContractKind> = match kind {
		Some(kind) => vec![kind],
		None => ContractKind::ALL.to_vec(),
	};
	kinds
		.into_iter()
		.find_map(|kind| abi(kind).function(name).and_then(|functions| functions.first()))
}

fn function_by_selector(selector: &[u8]) -> Option<&'static Function> {
	ContractKind::ALL.iter().find_map(|kind| {
		abi(*kind)
			.functions()
			.find(|function| function.selector().as_slice() == selector)
	})
}

fn zero_value(ty: &DynSolType) -> DynSolValue {
	match ty {
		DynSolType::Address => DynSolValue::Address(Address::ZERO),
		DynSolType::Bool => DynSolValue::Bool(false),
		DynSolType::Uint(size) => DynSolValue::Uint(U256::ZERO, *size),
		DynSolType::Int(size) => DynSolValue::Int(I256::ZERO, *size),
		DynSolType::String => DynSolValue::String(String::new()),
		DynSolType::Bytes => DynSolValue::Bytes(Vec::new()),
		DynSolType::FixedBytes(size) => DynSolValue::FixedBytes(B256::ZERO, *size),
		DynSolType::Array(_) => DynSolValue::Array(Vec::new()),
		DynSolType::FixedArray(inner, size) => {
			DynSolValue::FixedArray(vec![zero_value(inner); *size])
		}
		DynSolType::Tuple(types) => DynSolValue::Tuple(types.iter().map(zero_value).collect()),
		_ => DynSolValue::Uint(U256::ZERO, 256),
	}
}

fn zero_outputs(function: &Function) -> Vec<DynSolValue> {
	function
		.outputs
		.iter()
		.map(|param| {
			param
				.resolve()
				.map(|ty| zero_value(&ty))
				.unwrap_or(DynSolValue::Uint(U256::ZERO, 256))
		})
		.collect()
}

impl FakeChainClient {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, FakeChain> {
		self.chain.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn set_head(&self, head: u64) {
		self.lock().head = head;
	}

	pub fn head(&self) -> u64 {
		self.lock().head
	}

	/// Rewrites the hashes of every block from `from` on, as a reorg would
	pub fn fork(&self, from: u64, salt: u8) {
		self.lock().forks.push((from, salt));
	}

	pub fn header(&self, number: u64) -> BlockHeader {
		self.lock().header(number)
	}

	pub fn push_log(&self, log: ChainLog) {
		self.lock().logs.push(log);
	}

	pub fn push_logs(&self, logs: Vec<ChainLog>) {
		self.lock().logs.extend(logs);
	}

	/// Makes `get_logs` fail with `message` for ranges reaching `from`
	pub fn fail_logs_from(&self, from: u64, message: &str) {
		self.lock().failing_ranges.push((from, message.to_string()));
	}

	pub fn clear_log_failures(&self) {
		self.lock().failing_ranges.clear();
	}

	/// Output of `name` for any arguments
	pub fn set_output(
		&self,
		kind: ContractKind,
		address: Address,
		name: &str,
		values: Vec<DynSolValue>,
	) {
		if let Some(function) = find_function(Some(kind), name) {
			let mut chain = self.lock();
			chain.reverts.remove(&(address, function.selector()));
			chain.outputs.insert((address, function.selector()), values);
		}
	}

	/// Output of `name` for reads at `from_block` and later
	pub fn set_output_from(
		&self,
		kind: ContractKind,
		address: Address,
		name: &str,
		from_block: u64,
		values: Vec<DynSolValue>,
	) {
		if let Some(function) = find_function(Some(kind), name) {
			self.lock()
				.history
				.entry((address, function.selector()))
				.or_default()
				.push((from_block, values));
		}
	}

	/// Output of `name` when called with exactly `args`
	pub fn set_output_for(
		&self,
		kind: ContractKind,
		address: Address,
		name: &str,
		args: &[DynSolValue],
		values: Vec<DynSolValue>,
	) {
		let Some(function) = find_function(Some(kind), name) else {
			return;
		};
		if let Ok(calldata) = function.abi_encode_input(args) {
			self.lock().exact_outputs.insert((address, calldata), values);
		}
	}

	pub fn set_balance(&self, kind: ContractKind, token: Address, user: Address, amount: u64) {
		self.set_output_for(
			kind,
			token,
			"balanceOf",
			&[DynSolValue::Address(user)],
			vec![DynSolValue::Uint(U256::from(amount), 256)],
		);
	}

	/// Lists `contracts` as the LT contracts of a Directory
	pub fn set_directory(&self, directory: Address, contracts: &[Address]) {
		self.set_list(
			ContractKind::Directory,
			directory,
			"countLTContracts",
			"getLTContract",
			contracts,
		);
	}

	/// Lists `interfaces` as the validated interfaces of a DelegableToLT
	pub fn set_validated_interfaces(&self, token: Address, interfaces: &[Address]) {
		self.set_list(
			ContractKind::DelegableToLT,
			token,
			"countValidatedInterfaceProjectToken",
			"getValidatedInterfaceProjectToken",
			interfaces,
		);
	}

	fn set_list(
		&self,
		kind: ContractKind,
		address: Address,
		count_fn: &str,
		get_fn: &str,
		items: &[Address],
	) {
		self.set_output(
			kind,
			address,
			count_fn,
			vec![DynSolValue::Uint(U256::from(items.len()), 256)],
		);
		for (index, item) in items.iter().enumerate() {
			self.set_output_for(
				kind,
				address,
				get_fn,
				&[DynSolValue::Uint(U256::from(index), 256)],
				vec![DynSolValue::Address(*item)],
			);
		}
	}

	/// Makes every call of `name` on `address` revert
	pub fn revert(&self, address: Address, name: &str) {
		if let Some(function) = find_function(None, name) {
			self.lock().reverts.insert((address, function.selector()));
		}
	}

	/// Number of `eth_call`s served so far
	pub fn call_count(&self) -> usize {
		self.lock().calls
	}
}

#[async_trait]
impl ChainClient for FakeChainClient {
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error> {
		Ok(self.lock().head)
	}

	async fn get_block(&self, number: u64) -> Result<BlockHeader, anyhow::Error> {
		let chain = self.lock();
		if number > chain.head {
			return Err(anyhow::anyhow!("Block not found: {}", number));
		}
		Ok(chain.header(number))
	}

	async fn get_logs(
		&self,
		from_block: u64,
		to_block: u64,
		addresses: Option<Vec<Address>>,
	) -> Result<Vec<ChainLog>, anyhow::Error> {
		let chain = self.lock();
		if let Some((_, message)) = chain
			.failing_ranges
			.iter()
			.find(|(from, _)| to_block >= *from)
		{
			return Err(anyhow::anyhow!(message.clone())
				.context(format!("Failed to get logs for blocks: {} - {}", from_block, to_block)));
		}

		Ok(chain
			.logs
			.iter()
			.filter(|log| {
				let number = log.position().block_number;
				number >= from_block && number <= to_block
			})
			.filter(|log| {
				addresses
					.as_ref()
					.map(|addresses| addresses.contains(&log.address))
					.unwrap_or(true)
			})
			.cloned()
			.collect())
	}

	async fn call(
		&self,
		to: Address,
		data: Bytes,
		block: Option<u64>,
	) -> Result<Bytes, anyhow::Error> {
		let mut chain = self.lock();
		chain.calls += 1;
		let block = block.unwrap_or(chain.head);

		if data.len() < 4 {
			return Err(anyhow::anyhow!("execution reverted: missing selector"));
		}
		let selector = FixedBytes::<4>::from_slice(&data[..4]);
		if chain.reverts.contains(&(to, selector)) {
			return Err(anyhow::anyhow!("execution reverted"));
		}

		let function = function_by_selector(selector.as_slice())
			.ok_or_else(|| anyhow::anyhow!("execution reverted: unknown selector"))?;

		let values = chain
			.history
			.get(&(to, selector))
			.and_then(|entries| {
				entries
					.iter()
					.filter(|(from, _)| *from <= block)
					.max_by_key(|(from, _)| *from)
			})
			.map(|(_, values)| values)
			.or_else(|| chain.exact_outputs.get(&(to, data.to_vec())))
			.or_else(|| chain.outputs.get(&(to, selector)))
			.cloned()
			.unwrap_or_else(|| zero_outputs(function));

		Ok(function.abi_encode_output(&values)?.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_linear_chain_and_fork() {
		let chain = FakeChainClient::new();
		chain.set_head(10);

		let before = chain.get_block(8).await.unwrap();
		assert_eq!(before.parent_hash, chain.get_block(7).await.unwrap().hash);

		chain.fork(8, 1);
		let after = chain.get_block(8).await.unwrap();
		assert_ne!(after.hash, before.hash);
		assert_eq!(after.parent_hash, chain.get_block(7).await.unwrap().hash);
		assert!(chain.get_block(11).await.is_err());
	}

	#[tokio::test]
	async fn test_zero_valued_outputs() {
		let chain = FakeChainClient::new();
		let function = find_function(Some(ContractKind::ChargedToken), "name").unwrap();
		let calldata = function.abi_encode_input(&[]).unwrap();
		let output = chain
			.call(Address::with_last_byte(1), calldata.into(), None)
			.await
			.unwrap();
		let decoded = function.abi_decode_output(&output).unwrap();
		assert_eq!(decoded, vec![DynSolValue::String(String::new())]);
		assert_eq!(chain.call_count(), 1);
	}
}
