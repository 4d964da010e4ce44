//! DelegableToLT transitions.
//!
//! Project token balances live in the `balancePT` column of the ChargedToken
//! balance rows mirroring the token. A transfer updates one row per party
//! and the façade copies the new value to the party's other rows.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
	models::{format_address, is_zero_amount, ContractKind, Delta},
	repositories::Session,
	services::{
		blockchain::contracts::DecodedLog,
		handlers::{unknown_event, Change, EventContext, EventHandler},
		indexer::{BlockchainRepository, IndexerError},
	},
};

enum DelegableToLTEvent {
	OwnershipTransferred { new_owner: Address },
	Transfer { from: Address, to: Address, value: String },
	AddedInterfaceProjectToken(Address),
	ListOfValidatedInterfaceProjectTokenIsFinalized,
	InterfaceProjectTokenRemoved(Address),
	Ignored,
}

impl DelegableToLTEvent {
	fn decode(log: &DecodedLog, address: Address) -> Result<Self, IndexerError> {
		let event = match log.name.as_str() {
			"OwnershipTransferred" => Self::OwnershipTransferred {
				new_owner: log.address(1)?,
			},
			"Transfer" => Self::Transfer {
				from: log.address(0)?,
				to: log.address(1)?,
				value: log.amount(2)?,
			},
			"AddedInterfaceProjectToken" => Self::AddedInterfaceProjectToken(log.address(0)?),
			"ListOfValidatedInterfaceProjectTokenIsFinalized" => {
				Self::ListOfValidatedInterfaceProjectTokenIsFinalized
			}
			"InterfaceProjectTokenRemoved" => Self::InterfaceProjectTokenRemoved(log.address(0)?),
			"Approval" => Self::Ignored,
			other => return Err(unknown_event(ContractKind::DelegableToLT, address, other)),
		};
		Ok(event)
	}
}

pub struct DelegableToLTHandler {
	chain_id: u64,
	address: Address,
}

impl DelegableToLTHandler {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self { chain_id, address }
	}

	async fn overwrite(&self, context: &EventContext<'_>, delta: Delta) -> Result<(), IndexerError> {
		context
			.overwrite(ContractKind::DelegableToLT, self.address, delta)
			.await
			.map(|_| ())
	}

	async fn validated_interfaces(
		&self,
		context: &EventContext<'_>,
	) -> Result<Vec<Address>, IndexerError> {
		Ok(context
			.state(ContractKind::DelegableToLT, self.address)
			.await?
			.as_delegable_to_lt()
			.map(|token| token.validated_interface_project_token.clone())
			.unwrap_or_default())
	}

	async fn set_validated_interfaces(
		&self,
		context: &EventContext<'_>,
		interfaces: Vec<Address>,
	) -> Result<(), IndexerError> {
		self.overwrite(
			context,
			Delta::new().with(
				"validatedInterfaceProjectToken",
				interfaces.iter().map(format_address).collect::<Vec<_>>(),
			),
		)
		.await
	}

	/// Moves `balancePT` of `user` on the first cached row mirroring this
	/// token; the other rows follow through propagation
	async fn update_project_token_balance(
		&self,
		context: &EventContext<'_>,
		user: Address,
		change: Change,
	) -> Result<(), IndexerError> {
		let rows = context
			.repository
			.get_balances_by_project_token(self.address, user, context.session)
			.await?;
		let Some(row) = rows.first() else {
			return Ok(());
		};
		context
			.update_cached_balance(
				row.address,
				user,
				vec![("balancePT", change)],
				Some(self.address),
			)
			.await
			.map(|_| ())
	}

	async fn on_transfer(
		&self,
		context: &EventContext<'_>,
		from: Address,
		to: Address,
		value: String,
	) -> Result<(), IndexerError> {
		if is_zero_amount(&value) {
			return Ok(());
		}

		let mut changes = Vec::new();
		if from == Address::ZERO {
			changes.push(("totalSupply", Change::Increase(value.clone())));
		}
		if to == Address::ZERO {
			changes.push(("totalSupply", Change::Decrease(value.clone())));
		}
		if !changes.is_empty() {
			context
				.update(ContractKind::DelegableToLT, self.address, changes)
				.await?;
		}

		if from != Address::ZERO {
			self.update_project_token_balance(context, from, Change::Decrease(value.clone()))
				.await?;
		}
		if to != Address::ZERO {
			self.update_project_token_balance(context, to, Change::Increase(value))
				.await?;
		}
		Ok(())
	}
}

#[async_trait]
impl EventHandler for DelegableToLTHandler {
	fn kind(&self) -> ContractKind {
		ContractKind::DelegableToLT
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

		match DelegableToLTEvent::decode(log, self.address)? {
			DelegableToLTEvent::OwnershipTransferred { new_owner } => {
				self.overwrite(&context, Delta::new().with_address("owner", new_owner))
					.await
			}
			DelegableToLTEvent::Transfer { from, to, value } => {
				self.on_transfer(&context, from, to, value).await
			}
			DelegableToLTEvent::AddedInterfaceProjectToken(interface) => {
				let mut interfaces = self.validated_interfaces(&context).await?;
				if !interfaces.contains(&interface) {
					interfaces.push(interface);
				}
				self.set_validated_interfaces(&context, interfaces).await
			}
			DelegableToLTEvent::ListOfValidatedInterfaceProjectTokenIsFinalized => {
				self.overwrite(
					&context,
					Delta::new().with("isListOfInterfaceProjectTokenComplete", true),
				)
				.await
			}
			DelegableToLTEvent::InterfaceProjectTokenRemoved(interface) => {
				let mut interfaces = self.validated_interfaces(&context).await?;
				interfaces.retain(|item| *item != interface);
				self.set_validated_interfaces(&context, interfaces).await
			}
			DelegableToLTEvent::Ignored => Ok(()),
		}
	}
}
