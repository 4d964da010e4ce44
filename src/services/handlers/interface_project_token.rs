//! InterfaceProjectToken transitions.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::json;

use crate::{
	models::{ContractKind, Delta},
	repositories::Session,
	services::{
		blockchain::contracts::DecodedLog,
		handlers::{unknown_event, Change, EventContext, EventHandler},
		indexer::{BlockchainRepository, IndexerError},
	},
};

enum InterfaceProjectTokenEvent {
	OwnershipTransferred { new_owner: Address },
	StartSet { date_launch: String, date_end_cliff: String },
	IncreasedValueProjectTokenToFullRecharge { user: Address, value_increased: String },
	LTRecharged { user: Address, value_decreased: String },
	ClaimFeesUpdated(String),
	/// Project token moves are tracked through DelegableToLT transfers
	ProjectTokenReceived,
}

impl InterfaceProjectTokenEvent {
	fn decode(log: &DecodedLog, address: Address) -> Result<Self, IndexerError> {
		let event = match log.name.as_str() {
			"OwnershipTransferred" => Self::OwnershipTransferred {
				new_owner: log.address(1)?,
			},
			"StartSet" => Self::StartSet {
				date_launch: log.amount(0)?,
				date_end_cliff: log.amount(1)?,
			},
			"IncreasedValueProjectTokenToFullRecharge" => {
				Self::IncreasedValueProjectTokenToFullRecharge {
					user: log.address(0)?,
					value_increased: log.amount(1)?,
				}
			}
			"LTRecharged" => Self::LTRecharged {
				user: log.address(0)?,
				value_decreased: log.amount(3)?,
			},
			"ClaimFeesUpdated" => Self::ClaimFeesUpdated(log.amount(0)?),
			"ProjectTokenReceived" => Self::ProjectTokenReceived,
			other => {
				return Err(unknown_event(
					ContractKind::InterfaceProjectToken,
					address,
					other,
				))
			}
		};
		Ok(event)
	}
}

pub struct InterfaceProjectTokenHandler {
	chain_id: u64,
	address: Address,
}

impl InterfaceProjectTokenHandler {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self { chain_id, address }
	}

	async fn overwrite(&self, context: &EventContext<'_>, delta: Delta) -> Result<(), IndexerError> {
		context
			.overwrite(ContractKind::InterfaceProjectToken, self.address, delta)
			.await
			.map(|_| ())
	}

	/// The ChargedToken whose balance rows this interface feeds
	async fn liquidity_token(&self, context: &EventContext<'_>) -> Result<Address, IndexerError> {
		let snapshot = context
			.state(ContractKind::InterfaceProjectToken, self.address)
			.await?;
		Ok(snapshot
			.as_interface_project_token()
			.map(|interface| interface.liquidity_token)
			.unwrap_or(Address::ZERO))
	}

	async fn on_increased_value_to_full_recharge(
		&self,
		context: &EventContext<'_>,
		user: Address,
		value_increased: String,
	) -> Result<(), IndexerError> {
		let liquidity_token = self.liquidity_token(context).await?;
		if context
			.repository
			.get_balance(liquidity_token, user, context.session)
			.await?
			.is_none()
		{
			return Ok(());
		}

		let record = context
			.repository
			.handle(ContractKind::ChargedToken, liquidity_token)
			.at_block(context.block_number)
			.user_liqui_token(user)
			.await?;
		context
			.update_cached_balance(
				liquidity_token,
				user,
				vec![
					(
						"valueProjectTokenToFullRecharge",
						Change::Increase(value_increased),
					),
					(
						"dateOfPartiallyCharged",
						Change::Set(json!(record.date_of_partially_charged)),
					),
				],
				None,
			)
			.await
			.map(|_| ())
	}
}

#[async_trait]
impl EventHandler for InterfaceProjectTokenHandler {
	fn kind(&self) -> ContractKind {
		ContractKind::InterfaceProjectToken
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

		match InterfaceProjectTokenEvent::decode(log, self.address)? {
			InterfaceProjectTokenEvent::OwnershipTransferred { new_owner } => {
				self.overwrite(&context, Delta::new().with_address("owner", new_owner))
					.await
			}
			InterfaceProjectTokenEvent::StartSet {
				date_launch,
				date_end_cliff,
			} => {
				self.overwrite(
					&context,
					Delta::new()
						.with("dateLaunch", date_launch)
						.with("dateEndCliff", date_end_cliff),
				)
				.await
			}
			InterfaceProjectTokenEvent::IncreasedValueProjectTokenToFullRecharge {
				user,
				value_increased,
			} => {
				self.on_increased_value_to_full_recharge(&context, user, value_increased)
					.await
			}
			InterfaceProjectTokenEvent::LTRecharged {
				user,
				value_decreased,
			} => {
				let liquidity_token = self.liquidity_token(&context).await?;
				context
					.update_cached_balance(
						liquidity_token,
						user,
						vec![(
							"valueProjectTokenToFullRecharge",
							Change::Decrease(value_decreased),
						)],
						None,
					)
					.await
					.map(|_| ())
			}
			InterfaceProjectTokenEvent::ClaimFeesUpdated(value) => {
				self.overwrite(
					&context,
					Delta::new().with("claimFeesPerThousandForPT", value),
				)
				.await
			}
			InterfaceProjectTokenEvent::ProjectTokenReceived => Ok(()),
		}
	}
}
