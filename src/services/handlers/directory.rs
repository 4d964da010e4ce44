//! Directory transitions.
//!
//! List edits rewrite the affected collections of the snapshot. Adding or
//! removing an LT contract also registers or unregisters the ChargedToken
//! and everything hanging below it.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::json;

use crate::{
	models::{format_address, ContractKind, Delta, DirectorySnapshot},
	repositories::Session,
	services::{
		blockchain::contracts::DecodedLog,
		handlers::{unknown_event, EventContext, EventHandler},
		indexer::{BlockchainRepository, IndexerError},
	},
};

enum DirectoryEvent {
	OwnershipTransferred { new_owner: Address },
	UserFunctionsAreDisabled(bool),
	ProjectOwnerWhitelisted { owner: Address, project: String },
	AddedLTContract { contract: Address, project: String },
	RemovedLTContract(Address),
	RemovedProjectByAdmin(Address),
	ChangedProjectOwnerAccount { old_owner: Address, new_owner: Address },
	ChangedProjectName { old_name: String, new_name: String },
	AllocatedLTToProject { contract: Address, project: String },
	AllocatedProjectOwnerToProject { owner: Address, project: String },
}

impl DirectoryEvent {
	fn decode(log: &DecodedLog, address: Address) -> Result<Self, IndexerError> {
		let event = match log.name.as_str() {
			"OwnershipTransferred" => Self::OwnershipTransferred {
				new_owner: log.address(1)?,
			},
			"UserFunctionsAreDisabled" => Self::UserFunctionsAreDisabled(log.boolean(0)?),
			"ProjectOwnerWhitelisted" => Self::ProjectOwnerWhitelisted {
				owner: log.address(0)?,
				project: log.string(1)?,
			},
			"AddedLTContract" => Self::AddedLTContract {
				contract: log.address(0)?,
				project: log.string(1)?,
			},
			"RemovedLTContract" => Self::RemovedLTContract(log.address(0)?),
			"RemovedProjectByAdmin" => Self::RemovedProjectByAdmin(log.address(0)?),
			"ChangedProjectOwnerAccount" => Self::ChangedProjectOwnerAccount {
				old_owner: log.address(0)?,
				new_owner: log.address(1)?,
			},
			"ChangedProjectName" => Self::ChangedProjectName {
				old_name: log.string(0)?,
				new_name: log.string(1)?,
			},
			"AllocatedLTToProject" => Self::AllocatedLTToProject {
				contract: log.address(0)?,
				project: log.string(1)?,
			},
			"AllocatedProjectOwnerToProject" => Self::AllocatedProjectOwnerToProject {
				owner: log.address(0)?,
				project: log.string(1)?,
			},
			other => return Err(unknown_event(ContractKind::Directory, address, other)),
		};
		Ok(event)
	}
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
	if !items.contains(&item) {
		items.push(item);
	}
}

/// Delta rewriting every list and map of the directory
fn collections_delta(directory: &DirectorySnapshot) -> Delta {
	Delta::new()
		.with(
			"directory",
			directory
				.directory
				.iter()
				.map(format_address)
				.collect::<Vec<_>>(),
		)
		.with(
			"whitelistedProjectOwners",
			directory
				.whitelisted_project_owners
				.iter()
				.map(format_address)
				.collect::<Vec<_>>(),
		)
		.with("projects", directory.projects.clone())
		.with("projectRelatedToLT", json!(directory.project_related_to_lt))
		.with("whitelist", json!(directory.whitelist))
}

pub struct DirectoryHandler {
	chain_id: u64,
	address: Address,
}

impl DirectoryHandler {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self { chain_id, address }
	}

	async fn overwrite(&self, context: &EventContext<'_>, delta: Delta) -> Result<(), IndexerError> {
		context
			.overwrite(ContractKind::Directory, self.address, delta)
			.await
			.map(|_| ())
	}

	/// Rewrites the collections after `edit` ran on the stored snapshot
	async fn edit(
		&self,
		context: &EventContext<'_>,
		edit: impl FnOnce(&mut DirectorySnapshot),
	) -> Result<(), IndexerError> {
		let snapshot = context.state(ContractKind::Directory, self.address).await?;
		let mut directory = snapshot.as_directory().cloned().ok_or_else(|| {
			IndexerError::handler_error("Stored snapshot is not a Directory", None, None)
		})?;
		edit(&mut directory);
		self.overwrite(context, collections_delta(&directory)).await
	}

	async fn on_added_lt_contract(
		&self,
		context: &EventContext<'_>,
		contract: Address,
		project: String,
	) -> Result<(), IndexerError> {
		self.edit(context, |directory| {
			push_unique(&mut directory.directory, contract);
			if !project.is_empty() {
				directory
					.project_related_to_lt
					.insert(format_address(&contract), project);
			}
		})
		.await?;

		if !context.repository.is_contract_registered(contract).await {
			context
				.repository
				.registry()
				.register_charged_token(contract, context.block_number, context.session)
				.await?;
		}
		Ok(())
	}

	async fn on_removed_lt_contract(
		&self,
		context: &EventContext<'_>,
		contract: Address,
	) -> Result<(), IndexerError> {
		self.edit(context, |directory| {
			directory.directory.retain(|item| *item != contract);
			directory
				.project_related_to_lt
				.remove(&format_address(&contract));
		})
		.await?;

		if context.repository.is_contract_registered(contract).await {
			context
				.repository
				.registry()
				.unregister_charged_token(contract, context.session)
				.await?;
		}
		Ok(())
	}
}

#[async_trait]
impl EventHandler for DirectoryHandler {
	fn kind(&self) -> ContractKind {
		ContractKind::Directory
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn on_event(
		&self,
		repository: &BlockchainRepository,
		session: Option<&Session>,
		log: &DecodedLog,
		block_number: u64,
	) -> Result<(), IndexerError> {
		let context = EventContext::new(repository, session, block_number, &log.name);

		match DirectoryEvent::decode(log, self.address)? {
			DirectoryEvent::OwnershipTransferred { new_owner } => {
				self.overwrite(&context, Delta::new().with_address("owner", new_owner))
					.await
			}
			DirectoryEvent::UserFunctionsAreDisabled(disabled) => {
				self.overwrite(
					&context,
					Delta::new().with("areUserFunctionsDisabled", disabled),
				)
				.await
			}
			DirectoryEvent::ProjectOwnerWhitelisted { owner, project } => {
				self.edit(&context, |directory| {
					push_unique(&mut directory.whitelisted_project_owners, owner);
					push_unique(&mut directory.projects, project.clone());
					directory.whitelist.insert(format_address(&owner), project);
				})
				.await
			}
			DirectoryEvent::AddedLTContract { contract, project } => {
				self.on_added_lt_contract(&context, contract, project)
					.await
			}
			DirectoryEvent::RemovedLTContract(contract) => {
				self.on_removed_lt_contract(&context, contract).await
			}
			DirectoryEvent::RemovedProjectByAdmin(owner) => {
				self.edit(&context, |directory| {
					directory.whitelisted_project_owners.retain(|item| *item != owner);
					if let Some(project) = directory.whitelist.remove(&format_address(&owner)) {
						directory.projects.retain(|item| *item != project);
						directory
							.project_related_to_lt
							.retain(|_, related| *related != project);
					}
				})
				.await
			}
			DirectoryEvent::ChangedProjectOwnerAccount {
				old_owner,
				new_owner,
			} => {
				self.edit(&context, |directory| {
					for item in directory.whitelisted_project_owners.iter_mut() {
						if *item == old_owner {
							*item = new_owner;
						}
					}
					if let Some(project) = directory.whitelist.remove(&format_address(&old_owner)) {
						directory.whitelist.insert(format_address(&new_owner), project);
					}
				})
				.await
			}
			DirectoryEvent::ChangedProjectName { old_name, new_name } => {
				self.edit(&context, |directory| {
					let rename = |name: &mut String| {
						if *name == old_name {
							*name = new_name.clone();
						}
					};
					directory.projects.iter_mut().for_each(rename);
					directory.whitelist.values_mut().for_each(rename);
					directory.project_related_to_lt.values_mut().for_each(rename);
				})
				.await
			}
			DirectoryEvent::AllocatedLTToProject { contract, project } => {
				self.edit(&context, |directory| {
					directory
						.project_related_to_lt
						.insert(format_address(&contract), project);
				})
				.await
			}
			DirectoryEvent::AllocatedProjectOwnerToProject { owner, project } => {
				self.edit(&context, |directory| {
					push_unique(&mut directory.whitelisted_project_owners, owner);
					directory.whitelist.insert(format_address(&owner), project);
				})
				.await
			}
		}
	}
}
