//! Façade over the chain, the state repository and the broker.
//!
//! Every state change of the indexer goes through [`BlockchainRepository`]:
//! handlers describe a change as a [`Delta`], the façade checks it, persists
//! it and publishes the resulting document. The façade also owns the
//! registration graph and the event listener.

use alloy::primitives::Address;
use futures::future::try_join_all;
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, instrument};

use crate::{
	models::{
		format_address, merge_document, sort_logs, ContractKind, ContractSnapshot, Delta,
		Network, StateError, UserBalance, BALANCE_NUMERIC_FIELDS,
	},
	repositories::{Session, StateRepository},
	services::{
		blockchain::{
			contracts::{ContractHandle, ContractInterface},
			ChainClient,
		},
		handlers::create_handler,
		indexer::{
			graph::{RegisteredContract, RegistrationGraph},
			listener::EventListener,
			loader::EventsLoader,
			registry::ContractsRegistry,
			IndexerError,
		},
		notification::{NotificationBroker, UpdateTopic},
	},
};

pub struct BlockchainRepository {
	network: Network,
	client: Arc<dyn ChainClient>,
	store: Arc<dyn StateRepository>,
	broker: Arc<dyn NotificationBroker>,
	graph: RegistrationGraph,
	listener: EventListener,
}

impl BlockchainRepository {
	pub fn new(
		network: Network,
		client: Arc<dyn ChainClient>,
		store: Arc<dyn StateRepository>,
		broker: Arc<dyn NotificationBroker>,
	) -> Self {
		let graph = RegistrationGraph::new(network.slug.clone());
		let listener = EventListener::new(network.slug.clone(), network.chain_id);
		Self {
			network,
			client,
			store,
			broker,
			graph,
			listener,
		}
	}

	pub fn network(&self) -> &Network {
		&self.network
	}

	pub fn chain_id(&self) -> u64 {
		self.network.chain_id
	}

	pub fn client(&self) -> &Arc<dyn ChainClient> {
		&self.client
	}

	pub fn store(&self) -> &Arc<dyn StateRepository> {
		&self.store
	}

	pub fn graph(&self) -> &RegistrationGraph {
		&self.graph
	}

	pub fn listener(&self) -> &EventListener {
		&self.listener
	}

	/// Opens a store session whose graph changes are journaled with it
	pub async fn start_session(&self) -> Result<Session, IndexerError> {
		Ok(self.store.start_session().await?)
	}

	/// Commits a session in the store and keeps its graph changes. A failed
	/// commit rolls the graph changes back.
	pub async fn commit_session(&self, session: Session) -> Result<(), IndexerError> {
		let id = session.id();
		if let Err(e) = self.store.commit_session(session).await {
			self.graph.rollback(id).await;
			return Err(e.into());
		}
		self.graph.forget(id).await;
		Ok(())
	}

	/// Aborts a session in the store and rolls its graph changes back
	pub async fn abort_session(&self, session: Session) -> Result<(), IndexerError> {
		let id = session.id();
		let result = self.store.abort_session(session).await;
		let undone = self.graph.rollback(id).await;
		if undone > 0 {
			debug!(session = %id, changes = undone, "Discarded registration changes of aborted session");
		}
		Ok(result?)
	}

	/// Walks and maintains the registration graph
	pub fn registry(&self) -> ContractsRegistry<'_> {
		ContractsRegistry::new(self)
	}

	/// Live handle on a contract, whether registered or not. Reads target the
	/// latest block until pinned with [`ContractHandle::at_block`].
	pub fn handle(&self, kind: ContractKind, address: Address) -> ContractHandle {
		ContractHandle::new(kind, address, self.client.clone())
	}

	pub async fn get_block_number(&self) -> Result<u64, IndexerError> {
		self.client.get_latest_block_number().await.map_err(|e| {
			IndexerError::chain_error("Failed to get block number", Some(e.into()), None)
		})
	}

	pub async fn is_contract_registered(&self, address: Address) -> bool {
		self.graph.contains(&address).await
	}

	pub async fn is_delegable_still_referenced(
		&self,
		address: Address,
		session: Option<&Session>,
	) -> Result<bool, IndexerError> {
		Ok(self
			.store
			.is_delegable_still_referenced(self.chain_id(), address, session)
			.await?)
	}

	pub async fn get_last_state(
		&self,
		kind: ContractKind,
		address: Address,
		session: Option<&Session>,
	) -> Result<Option<ContractSnapshot>, IndexerError> {
		Ok(self
			.store
			.get(kind, self.chain_id(), address, session)
			.await?)
	}

	/// Like [`Self::get_last_state`], failing when no snapshot is stored
	pub async fn require_state(
		&self,
		kind: ContractKind,
		address: Address,
		session: Option<&Session>,
	) -> Result<ContractSnapshot, IndexerError> {
		self.get_last_state(kind, address, session)
			.await?
			.ok_or_else(|| {
				IndexerError::handler_error(
					format!("No {} snapshot stored", kind),
					None,
					Some(self.metadata(kind, address)),
				)
			})
	}

	/// Adds a contract to the graph.
	///
	/// A contract without a stored snapshot is read from the chain and
	/// persisted. A contract with one replays the events it missed, from the
	/// block after its `lastUpdateBlock` up to `block_number`.
	#[instrument(skip(self, session), fields(network = %self.network.slug, chain_id = self.network.chain_id))]
	pub async fn register_contract(
		&self,
		kind: ContractKind,
		address: Address,
		block_number: u64,
		session: Option<&Session>,
	) -> Result<ContractSnapshot, IndexerError> {
		if let Some(existing) = self.graph.kind_of(&address).await {
			return Err(IndexerError::registration_error(
				format!("Contract already registered as {}", existing),
				None,
				Some(self.metadata(kind, address)),
			));
		}
		if kind == ContractKind::Directory && self.graph.has_directory().await {
			return Err(IndexerError::registration_error(
				"A Directory is already registered",
				None,
				Some(self.metadata(kind, address)),
			));
		}

		let entry = RegisteredContract {
			kind,
			handler: create_handler(kind, self.chain_id(), address),
			interface: ContractInterface::new(kind),
			handle: self.handle(kind, address),
			registered_at: block_number,
		};

		match self.get_last_state(kind, address, session).await? {
			Some(stored) => {
				self.graph.insert(entry, session).await?;
				info!(
					kind = %kind,
					contract = %format_address(&address),
					last_update_block = stored.last_update_block(),
					"Registered contract from stored state"
				);

				let from_block = stored.last_update_block() + 1;
				if from_block <= block_number {
					if let Err(e) = self
						.sync_events(address, from_block, block_number, session)
						.await
					{
						self.graph.remove(&address, session).await;
						return Err(e);
					}
				}
				Ok(self
					.get_last_state(kind, address, session)
					.await?
					.unwrap_or(stored))
			}
			None => {
				let snapshot = entry.handle.load_snapshot(self.chain_id(), block_number).await?;
				self.store.save(&snapshot, session).await?;
				self.graph.insert(entry, session).await?;
				self.notify_snapshot(&snapshot)?;
				info!(
					kind = %kind,
					contract = %format_address(&address),
					block_number,
					"Registered contract from chain state"
				);
				Ok(snapshot)
			}
		}
	}

	/// Removes a contract from the graph and deletes its snapshot, and its
	/// balances when it is a ChargedToken
	#[instrument(skip(self, session), fields(network = %self.network.slug, chain_id = self.network.chain_id))]
	pub async fn unregister_contract(
		&self,
		kind: ContractKind,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		if self.graph.remove(&address, session).await.is_none() {
			return Err(IndexerError::registration_error(
				"Contract is not registered",
				None,
				Some(self.metadata(kind, address)),
			));
		}

		self.store
			.delete(kind, self.chain_id(), address, session)
			.await?;
		if kind == ContractKind::ChargedToken {
			self.store
				.delete_balances_by_contract(self.chain_id(), address, session)
				.await?;
		}

		info!(kind = %kind, contract = %format_address(&address), "Unregistered contract");
		Ok(())
	}

	/// Applies `delta` to the snapshot of a contract, creating it when absent,
	/// and publishes the result
	pub async fn apply_update_and_notify(
		&self,
		kind: ContractKind,
		address: Address,
		delta: Delta,
		block_number: u64,
		event_name: Option<&str>,
		session: Option<&Session>,
	) -> Result<ContractSnapshot, IndexerError> {
		delta.check_non_negative(kind.numeric_fields())?;

		let mut delta = delta;
		let updated = match self.get_last_state(kind, address, session).await? {
			Some(current) => {
				delta.set(
					"lastUpdateBlock",
					current.last_update_block().max(block_number),
				);
				self.store
					.update(kind, self.chain_id(), address, &delta, session)
					.await?
			}
			None => {
				delta.set("lastUpdateBlock", block_number);
				let snapshot =
					ContractSnapshot::empty(kind, self.chain_id(), address).merge(&delta)?;
				self.store.save(&snapshot, session).await?;
				snapshot
			}
		};

		debug!(
			kind = %kind,
			contract = %format_address(&address),
			event = event_name.unwrap_or("-"),
			block_number,
			"Applied update"
		);
		self.notify_snapshot(&updated)?;
		Ok(updated)
	}

	/// Applies `delta` to the balance row of `user` on the ChargedToken
	/// `address`, creating it when absent, and publishes it.
	///
	/// When the delta carries `balancePT` and `pt_address` is given, the
	/// value is copied to every other row of the user mirroring the same
	/// project token, and each of those rows is published as well.
	#[allow(clippy::too_many_arguments)]
	pub async fn update_balance_and_notify(
		&self,
		address: Address,
		user: Address,
		delta: Delta,
		block_number: u64,
		pt_address: Option<Address>,
		event_name: Option<&str>,
		session: Option<&Session>,
	) -> Result<UserBalance, IndexerError> {
		delta.check_non_negative(BALANCE_NUMERIC_FIELDS)?;

		let chain_id = self.chain_id();
		let mut delta = delta;
		let updated = match self
			.store
			.get_balance(chain_id, address, user, session)
			.await?
		{
			Some(current) => {
				delta.set(
					"lastUpdateBlock",
					current.last_update_block.max(block_number),
				);
				self.store
					.update_balance(chain_id, address, user, &delta, session)
					.await?
			}
			None => {
				delta.set("lastUpdateBlock", block_number);
				let row = merge_document(&UserBalance::new(chain_id, address, user), &delta)?;
				self.store.save_balance(&row, session).await?;
				row
			}
		};
		self.notify_balance(&updated)?;

		if let (Some(pt_address), Some(balance_pt)) = (pt_address, delta.get("balancePT")) {
			let propagated = Delta::new()
				.with("balancePT", balance_pt.clone())
				.with_address("ptAddress", pt_address)
				.with("lastUpdateBlock", block_number);
			let others = self
				.store
				.update_other_balances_by_project_token(
					chain_id,
					address,
					pt_address,
					user,
					&propagated,
					session,
				)
				.await?;
			for row in &others {
				self.notify_balance(row)?;
			}
			debug!(
				user = %format_address(&user),
				project_token = %format_address(&pt_address),
				rows = others.len(),
				"Propagated project token balance"
			);
		}

		debug!(
			contract = %format_address(&address),
			user = %format_address(&user),
			event = event_name.unwrap_or("-"),
			block_number,
			"Applied balance update"
		);
		Ok(updated)
	}

	/// Points every cached balance row of the ChargedToken `address` at the
	/// project token `pt_address` and refreshes their `balancePT` from the chain
	pub async fn propagate_project_token(
		&self,
		address: Address,
		pt_address: Address,
		block_number: u64,
		event_name: Option<&str>,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, IndexerError> {
		let rows = self
			.store
			.update_pt_balances(self.chain_id(), address, pt_address, session)
			.await?;

		let project_token = self
			.handle(ContractKind::DelegableToLT, pt_address)
			.at_block(block_number);
		let balances = try_join_all(rows.iter().map(|row| project_token.balance_of(row.user))).await?;

		let mut updated = Vec::with_capacity(rows.len());
		for (row, balance_pt) in rows.iter().zip(balances) {
			updated.push(
				self.update_balance_and_notify(
					address,
					row.user,
					Delta::new().with("balancePT", balance_pt),
					block_number,
					None,
					event_name,
					session,
				)
				.await?,
			);
		}
		Ok(updated)
	}

	pub async fn get_balance(
		&self,
		address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Option<UserBalance>, IndexerError> {
		Ok(self
			.store
			.get_balance(self.chain_id(), address, user, session)
			.await?)
	}

	pub async fn get_balances_by_project_token(
		&self,
		pt_address: Address,
		user: Address,
		session: Option<&Session>,
	) -> Result<Vec<UserBalance>, IndexerError> {
		Ok(self
			.store
			.get_balances_by_project_token(self.chain_id(), pt_address, user, session)
			.await?)
	}

	/// Reads the balances of `user` on every registered ChargedToken, or on
	/// `address` only, then stores and publishes them
	#[instrument(skip(self), fields(network = %self.network.slug))]
	pub async fn load_all_user_balances(
		&self,
		user: Address,
		block_number: u64,
		address: Option<Address>,
	) -> Result<Vec<UserBalance>, IndexerError> {
		let tokens = match address {
			Some(address) => vec![address],
			None => self.graph.addresses_of(ContractKind::ChargedToken).await,
		};

		let deltas = try_join_all(
			tokens
				.iter()
				.map(|token| self.read_user_balance(*token, user)),
		)
		.await?;

		let mut rows = Vec::with_capacity(tokens.len());
		for (token, delta) in tokens.into_iter().zip(deltas) {
			rows.push(
				self.update_balance_and_notify(token, user, delta, block_number, None, None, None)
					.await?,
			);
		}
		info!(user = %format_address(&user), rows = rows.len(), "Loaded user balances");
		Ok(rows)
	}

	async fn read_user_balance(&self, token: Address, user: Address) -> Result<Delta, IndexerError> {
		let charged_token = self.handle(ContractKind::ChargedToken, token);
		let interface = match self
			.get_last_state(ContractKind::ChargedToken, token, None)
			.await?
		{
			Some(ContractSnapshot::ChargedToken(snapshot)) => snapshot.interface_project_token,
			_ => {
				charged_token
					.read_address("interfaceProjectToken", &[])
					.await?
			}
		};

		let (balance, record) = futures::try_join!(
			charged_token.balance_of(user),
			charged_token.user_liqui_token(user)
		)?;
		let mut delta = Delta::new()
			.with("balance", balance)
			.with("fullyChargedBalance", record.fully_charged_balance)
			.with("partiallyChargedBalance", record.partially_charged_balance)
			.with("dateOfPartiallyCharged", record.date_of_partially_charged)
			.with("claimedRewardPerShare1e18", record.claimed_reward_per_share_1e18);

		if interface != Address::ZERO {
			let interface_handle = self.handle(ContractKind::InterfaceProjectToken, interface);
			let project_token = match self
				.get_last_state(ContractKind::InterfaceProjectToken, interface, None)
				.await?
			{
				Some(ContractSnapshot::InterfaceProjectToken(snapshot)) => snapshot.project_token,
				_ => interface_handle.read_address("projectToken", &[]).await?,
			};

			delta.set(
				"valueProjectTokenToFullRecharge",
				interface_handle
					.value_project_token_to_full_recharge(user)
					.await?,
			);
			if project_token != Address::ZERO {
				delta.set(
					"balancePT",
					self.handle(ContractKind::DelegableToLT, project_token)
						.balance_of(user)
						.await?,
				);
				delta.set("ptAddress", format_address(&project_token));
			}
		}
		Ok(delta)
	}

	/// Starts the events loader from `from_block` on the given head stream
	pub async fn watch_for_updates(
		self: &Arc<Self>,
		from_block: u64,
		heads: broadcast::Receiver<u64>,
	) -> Result<JoinHandle<()>, IndexerError> {
		let mut loader = EventsLoader::new(self.clone());
		loader.start(from_block).await?;
		info!(
			network = %self.network.slug,
			from_block,
			contracts = self.graph.len().await,
			"Watching for updates"
		);
		Ok(tokio::spawn(loader.run(heads)))
	}

	/// Replays the logs of one registered contract in `[from_block, to_block]`
	#[instrument(skip(self, session), fields(network = %self.network.slug, contract = %format_address(&address)))]
	pub async fn sync_events(
		&self,
		address: Address,
		from_block: u64,
		to_block: u64,
		session: Option<&Session>,
	) -> Result<usize, IndexerError> {
		let entry = self.graph.get(&address).await.ok_or_else(|| {
			IndexerError::registration_error(
				"Cannot sync an unregistered contract",
				None,
				Some(HashMap::from([(
					"contract".to_string(),
					format_address(&address),
				)])),
			)
		})?;

		let mut logs = self
			.client
			.get_logs(from_block, to_block, Some(vec![address]))
			.await
			.map_err(|e| {
				IndexerError::chain_error(
					"Failed to fetch catch-up logs",
					Some(e.into()),
					Some(self.range_metadata(from_block, to_block)),
				)
			})?;
		sort_logs(&mut logs);

		info!(
			kind = %entry.kind,
			from_block,
			to_block,
			logs = logs.len(),
			"Catching up missed events"
		);

		let mut applied = 0;
		for log in logs.iter().filter(|log| entry.interface.knows(log)) {
			self.listener.handle_log(self, &entry, log, session).await?;
			applied += 1;
		}
		Ok(applied)
	}

	fn notify_snapshot(&self, snapshot: &ContractSnapshot) -> Result<(), IndexerError> {
		self.broker.notify_update(
			UpdateTopic::from(snapshot.kind()),
			snapshot.chain_id(),
			&format_address(&snapshot.address()),
			snapshot.to_document()?,
		);
		Ok(())
	}

	fn notify_balance(&self, balance: &UserBalance) -> Result<(), IndexerError> {
		let payload = serde_json::to_value(balance).map_err(StateError::from)?;
		self.broker.notify_update(
			UpdateTopic::UserBalance,
			balance.chain_id,
			&balance.notification_key(),
			payload,
		);
		Ok(())
	}

	fn metadata(&self, kind: ContractKind, address: Address) -> HashMap<String, String> {
		HashMap::from([
			("network".to_string(), self.network.slug.clone()),
			("kind".to_string(), kind.to_string()),
			("contract".to_string(), format_address(&address)),
		])
	}

	pub(crate) fn range_metadata(&self, from_block: u64, to_block: u64) -> HashMap<String, String> {
		HashMap::from([
			("network".to_string(), self.network.slug.clone()),
			("from_block".to_string(), from_block.to_string()),
			("to_block".to_string(), to_block.to_string()),
		])
	}
}
