//! Registration walks over the contract graph.
//!
//! Registration follows Directory -> ChargedToken -> InterfaceProjectToken ->
//! DelegableToLT and only recurses into non-zero references. Unregistration
//! walks the same edges backwards. A DelegableToLT shared by several
//! interfaces is registered once and only detached when no stored
//! InterfaceProjectToken points at it any more.

use alloy::primitives::Address;
use tracing::{debug, instrument};

use crate::{
	models::{ContractKind, ContractSnapshot},
	repositories::Session,
	services::indexer::{BlockchainRepository, IndexerError},
};

pub struct ContractsRegistry<'a> {
	repository: &'a BlockchainRepository,
}

impl<'a> ContractsRegistry<'a> {
	pub fn new(repository: &'a BlockchainRepository) -> Self {
		Self { repository }
	}

	/// Registers the Directory at the current head, then every ChargedToken it lists
	#[instrument(skip(self), fields(network = %self.repository.network().slug))]
	pub async fn register_directory(&self, address: Address) -> Result<ContractSnapshot, IndexerError> {
		let block_number = self.repository.get_block_number().await?;
		let snapshot = self
			.repository
			.register_contract(ContractKind::Directory, address, block_number, None)
			.await?;

		let contracts = snapshot
			.as_directory()
			.map(|directory| directory.directory.clone())
			.unwrap_or_default();
		for contract in contracts {
			if !self.repository.is_contract_registered(contract).await {
				self.register_charged_token(contract, block_number, None)
					.await?;
			}
		}
		Ok(snapshot)
	}

	pub async fn register_charged_token(
		&self,
		address: Address,
		block_number: u64,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let snapshot = self
			.repository
			.register_contract(ContractKind::ChargedToken, address, block_number, session)
			.await?;

		let interface = snapshot
			.as_charged_token()
			.map(|token| token.interface_project_token)
			.unwrap_or(Address::ZERO);
		if interface != Address::ZERO && !self.repository.is_contract_registered(interface).await {
			self.register_interface_project_token(interface, block_number, session)
				.await?;
		}
		Ok(())
	}

	pub async fn register_interface_project_token(
		&self,
		address: Address,
		block_number: u64,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let snapshot = self
			.repository
			.register_contract(
				ContractKind::InterfaceProjectToken,
				address,
				block_number,
				session,
			)
			.await?;

		let project_token = snapshot
			.as_interface_project_token()
			.map(|interface| interface.project_token)
			.unwrap_or(Address::ZERO);
		if project_token != Address::ZERO {
			self.register_delegable_to_lt(project_token, block_number, session)
				.await?;
		}
		Ok(())
	}

	/// Registers a project token, or counts one more reference to it when it
	/// is already tracked
	pub async fn register_delegable_to_lt(
		&self,
		address: Address,
		block_number: u64,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let graph = self.repository.graph();
		if !self.repository.is_contract_registered(address).await {
			self.repository
				.register_contract(ContractKind::DelegableToLT, address, block_number, session)
				.await?;
		}
		let references = graph.add_reference(address, session).await;
		debug!(project_token = %address, references, "Referenced project token");
		Ok(())
	}

	/// Unregisters the Directory and every ChargedToken it lists
	pub async fn unregister_directory(&self, address: Address) -> Result<(), IndexerError> {
		let contracts = self
			.repository
			.get_last_state(ContractKind::Directory, address, None)
			.await?
			.and_then(|snapshot| snapshot.as_directory().map(|d| d.directory.clone()))
			.unwrap_or_default();
		for contract in contracts {
			if self.repository.is_contract_registered(contract).await {
				self.unregister_charged_token(contract, None).await?;
			}
		}
		self.repository
			.unregister_contract(ContractKind::Directory, address, None)
			.await
	}

	pub async fn unregister_charged_token(
		&self,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let interface = self
			.repository
			.get_last_state(ContractKind::ChargedToken, address, session)
			.await?
			.and_then(|snapshot| {
				snapshot
					.as_charged_token()
					.map(|token| token.interface_project_token)
			})
			.unwrap_or(Address::ZERO);
		if interface != Address::ZERO && self.repository.is_contract_registered(interface).await {
			self.unregister_interface_project_token(interface, session)
				.await?;
		}
		self.repository
			.unregister_contract(ContractKind::ChargedToken, address, session)
			.await
	}

	/// Unregisters an interface, then its project token unless another stored
	/// interface still points at it
	pub async fn unregister_interface_project_token(
		&self,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		let project_token = self
			.repository
			.get_last_state(ContractKind::InterfaceProjectToken, address, session)
			.await?
			.and_then(|snapshot| {
				snapshot
					.as_interface_project_token()
					.map(|interface| interface.project_token)
			})
			.unwrap_or(Address::ZERO);

		self.repository
			.unregister_contract(ContractKind::InterfaceProjectToken, address, session)
			.await?;

		if project_token != Address::ZERO {
			self.repository
				.graph()
				.release_reference(&project_token, session)
				.await;
			self.unregister_delegable_to_lt(project_token, session)
				.await?;
		}
		Ok(())
	}

	/// Detaches a project token once no stored interface references it
	pub async fn unregister_delegable_to_lt(
		&self,
		address: Address,
		session: Option<&Session>,
	) -> Result<(), IndexerError> {
		if !self.repository.is_contract_registered(address).await {
			return Ok(());
		}
		if self
			.repository
			.is_delegable_still_referenced(address, session)
			.await?
		{
			debug!(project_token = %address, "Project token still referenced, keeping it");
			return Ok(());
		}
		self.repository
			.unregister_contract(ContractKind::DelegableToLT, address, session)
			.await
	}
}
