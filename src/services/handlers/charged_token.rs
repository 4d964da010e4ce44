//! ChargedToken transitions.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::{
	models::{
		format_address, is_zero_amount, ContractKind, Delta, FundraisingState, StateError,
	},
	repositories::Session,
	services::{
		blockchain::contracts::DecodedLog,
		handlers::{unknown_event, Change, EventContext, EventHandler},
		indexer::{BlockchainRepository, IndexerError},
	},
};

enum ChargedTokenEvent {
	OwnershipTransferred { new_owner: Address },
	Transfer { from: Address, to: Address, value: String },
	UserFunctionsAreDisabled(bool),
	InterfaceProjectTokenSet(Address),
	InterfaceProjectTokenIsLocked,
	IncreasedFullyChargedBalance { user: Address, value: String },
	LTAllocatedByOwner { user: Address, value: String, has_vesting_lt: bool },
	IncreasedTotalTokenAllocated(String),
	IncreasedStakedLT(String),
	AllocationsAreTerminated,
	DecreasedFullyChargedBalanceAndStakedLT { user: Address, value: String },
	DecreasedPartiallyChargedBalance { user: Address, value: String },
	UpdatedDateOfPartiallyChargedAndDecreasedStakedLT { user: Address, value: String },
	TokensDischarged { user: Address, partially_charged_balance: String },
	ClaimedRewardPerShareUpdated { user: Address, value: String },
	CurrentRewardPerShareAndStakingCheckpointUpdated { reward_per_share: String, block_time: String },
	IncreasedCurrentRewardPerShare(String),
	StakingCampaignCreated { start_date: String, duration: String, rewards: String },
	/// Plain field overwrite from a single amount argument
	FieldSet { field: &'static str, value: String },
	FundraisingConditionsSet { token: Address, symbol: String, price: String },
	FundraisingStatusChanged(bool),
	LTAllocatedThroughSale { user: Address, amount_lt: String },
	/// Covered by other events
	Ignored,
}

impl ChargedTokenEvent {
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
			"UserFunctionsAreDisabled" => Self::UserFunctionsAreDisabled(log.boolean(0)?),
			"InterfaceProjectTokenSet" => Self::InterfaceProjectTokenSet(log.address(0)?),
			"InterfaceProjectTokenIsLocked" => Self::InterfaceProjectTokenIsLocked,
			"IncreasedFullyChargedBalance" => Self::IncreasedFullyChargedBalance {
				user: log.address(0)?,
				value: log.amount(1)?,
			},
			"LTAllocatedByOwner" => Self::LTAllocatedByOwner {
				user: log.address(0)?,
				value: log.amount(1)?,
				has_vesting_lt: log.boolean(2)?,
			},
			"IncreasedTotalTokenAllocated" => Self::IncreasedTotalTokenAllocated(log.amount(0)?),
			"IncreasedStakedLT" => Self::IncreasedStakedLT(log.amount(0)?),
			"AllocationsAreTerminated" => Self::AllocationsAreTerminated,
			"DecreasedFullyChargedBalanceAndStakedLT" => {
				Self::DecreasedFullyChargedBalanceAndStakedLT {
					user: log.address(0)?,
					value: log.amount(1)?,
				}
			}
			"DecreasedPartiallyChargedBalance" => Self::DecreasedPartiallyChargedBalance {
				user: log.address(0)?,
				value: log.amount(1)?,
			},
			"UpdatedDateOfPartiallyChargedAndDecreasedStakedLT" => {
				Self::UpdatedDateOfPartiallyChargedAndDecreasedStakedLT {
					user: log.address(0)?,
					value: log.amount(1)?,
				}
			}
			"TokensDischarged" => Self::TokensDischarged {
				user: log.address(0)?,
				partially_charged_balance: log.amount(1)?,
			},
			"ClaimedRewardPerShareUpdated" => Self::ClaimedRewardPerShareUpdated {
				user: log.address(0)?,
				value: log.amount(1)?,
			},
			"CurrentRewardPerShareAndStakingCheckpointUpdated" => {
				Self::CurrentRewardPerShareAndStakingCheckpointUpdated {
					reward_per_share: log.amount(0)?,
					block_time: log.amount(1)?,
				}
			}
			"IncreasedCurrentRewardPerShare" => {
				Self::IncreasedCurrentRewardPerShare(log.amount(0)?)
			}
			"StakingCampaignCreated" => Self::StakingCampaignCreated {
				start_date: log.amount(0)?,
				duration: log.amount(1)?,
				rewards: log.amount(2)?,
			},
			"WithdrawalFeesPerThousandForLTSet" => Self::FieldSet {
				field: "withdrawFeesPerThousandForLT",
				value: log.amount(0)?,
			},
			"RatioFeesToRewardHodlersPerThousandSet" => Self::FieldSet {
				field: "ratioFeesToRewardHodlersPerThousand",
				value: log.amount(0)?,
			},
			"FractionInitialUnlockPerThousandSet" => Self::FieldSet {
				field: "fractionInitialUnlockPerThousand",
				value: log.amount(0)?,
			},
			"DurationCliffSet" => Self::FieldSet {
				field: "durationCliff",
				value: log.amount(0)?,
			},
			"DurationLinearVestingSet" => Self::FieldSet {
				field: "durationLinearVesting",
				value: log.amount(0)?,
			},
			"FundraisingConditionsSet" => Self::FundraisingConditionsSet {
				token: log.address(0)?,
				symbol: log.string(1)?,
				price: log.amount(2)?,
			},
			"FundraisingStatusChanged" => Self::FundraisingStatusChanged(log.boolean(0)?),
			"LTAllocatedThroughSale" => Self::LTAllocatedThroughSale {
				user: log.address(0)?,
				amount_lt: log.amount(1)?,
			},
			"Approval" | "LTReceived" | "LTDeposited" => Self::Ignored,
			other => return Err(unknown_event(ContractKind::ChargedToken, address, other)),
		};
		Ok(event)
	}
}

pub struct ChargedTokenHandler {
	chain_id: u64,
	address: Address,
}

impl ChargedTokenHandler {
	pub fn new(chain_id: u64, address: Address) -> Self {
		Self { chain_id, address }
	}

	async fn update(
		&self,
		context: &EventContext<'_>,
		changes: Vec<(&str, Change)>,
	) -> Result<(), IndexerError> {
		context
			.update(ContractKind::ChargedToken, self.address, changes)
			.await
			.map(|_| ())
	}

	async fn overwrite(&self, context: &EventContext<'_>, delta: Delta) -> Result<(), IndexerError> {
		context
			.overwrite(ContractKind::ChargedToken, self.address, delta)
			.await
			.map(|_| ())
	}

	async fn update_balance(
		&self,
		context: &EventContext<'_>,
		user: Address,
		changes: Vec<(&str, Change)>,
	) -> Result<(), IndexerError> {
		context
			.update_cached_balance(self.address, user, changes, None)
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
		if from == self.address {
			changes.push(("totalLocked", Change::Decrease(value.clone())));
		}
		if to == self.address {
			changes.push(("totalLocked", Change::Increase(value.clone())));
		}
		if from == Address::ZERO {
			changes.push(("totalSupply", Change::Increase(value.clone())));
		}
		if to == Address::ZERO {
			changes.push(("totalSupply", Change::Decrease(value.clone())));
		}
		if !changes.is_empty() {
			self.update(context, changes).await?;
		}

		if from != Address::ZERO && from != self.address {
			self.update_balance(context, from, vec![("balance", Change::Decrease(value.clone()))])
				.await?;
		}
		if to != Address::ZERO && to != self.address {
			self.update_balance(context, to, vec![("balance", Change::Increase(value))])
				.await?;
		}
		Ok(())
	}

	async fn on_interface_project_token_set(
		&self,
		context: &EventContext<'_>,
		interface: Address,
	) -> Result<(), IndexerError> {
		let repository = context.repository;
		if interface != Address::ZERO {
			if !repository.is_contract_registered(interface).await {
				repository
					.registry()
					.register_interface_project_token(
						interface,
						context.block_number,
						context.session,
					)
					.await?;
			}

			let project_token = context
				.state(ContractKind::InterfaceProjectToken, interface)
				.await?
				.as_interface_project_token()
				.map(|snapshot| snapshot.project_token)
				.unwrap_or(Address::ZERO);
			if project_token != Address::ZERO {
				let rows = repository
					.propagate_project_token(
						self.address,
						project_token,
						context.block_number,
						Some(context.event),
						context.session,
					)
					.await?;
				info!(
					contract = %format_address(&self.address),
					project_token = %format_address(&project_token),
					rows = rows.len(),
					"Attached project token to cached balances"
				);
			}
		}

		self.overwrite(
			context,
			Delta::new().with_address("interfaceProjectToken", interface),
		)
		.await
	}

	async fn on_updated_date_of_partially_charged(
		&self,
		context: &EventContext<'_>,
		user: Address,
		value: String,
	) -> Result<(), IndexerError> {
		self.update(context, vec![("stakedLT", Change::Decrease(value))])
			.await?;

		if context
			.repository
			.get_balance(self.address, user, context.session)
			.await?
			.is_none()
		{
			return Ok(());
		}
		// The new date is the block time of the transaction, only readable on chain.
		let record = context
			.repository
			.handle(ContractKind::ChargedToken, self.address)
			.at_block(context.block_number)
			.user_liqui_token(user)
			.await?;
		self.update_balance(
			context,
			user,
			vec![(
				"dateOfPartiallyCharged",
				Change::Set(json!(record.date_of_partially_charged)),
			)],
		)
		.await
	}

	async fn update_fundraising(
		&self,
		context: &EventContext<'_>,
		apply: impl FnOnce(&mut FundraisingState),
	) -> Result<(), IndexerError> {
		let mut fundraising = context
			.state(ContractKind::ChargedToken, self.address)
			.await?
			.as_charged_token()
			.and_then(|token| token.fundraising.clone())
			.unwrap_or_else(|| FundraisingState {
				is_fundraising_active: false,
				fundraising_token: Address::ZERO,
				fundraising_token_symbol: String::new(),
				price_token_per_1e18: "0".to_string(),
				fundraising_fees_per_thousand: "0".to_string(),
			});
		apply(&mut fundraising);

		let value: Value = serde_json::to_value(&fundraising).map_err(StateError::from)?;
		self.overwrite(context, Delta::new().with("fundraising", value))
			.await
	}
}

#[async_trait]
impl EventHandler for ChargedTokenHandler {
	fn kind(&self) -> ContractKind {
		ContractKind::ChargedToken
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

		match ChargedTokenEvent::decode(log, self.address)? {
			ChargedTokenEvent::OwnershipTransferred { new_owner } => {
				self.overwrite(&context, Delta::new().with_address("owner", new_owner))
					.await
			}
			ChargedTokenEvent::Transfer { from, to, value } => {
				self.on_transfer(&context, from, to, value).await
			}
			ChargedTokenEvent::UserFunctionsAreDisabled(disabled) => {
				self.overwrite(
					&context,
					Delta::new().with("areUserFunctionsDisabled", disabled),
				)
				.await
			}
			ChargedTokenEvent::InterfaceProjectTokenSet(interface) => {
				self.on_interface_project_token_set(&context, interface)
					.await
			}
			ChargedTokenEvent::InterfaceProjectTokenIsLocked => {
				self.overwrite(
					&context,
					Delta::new().with("isInterfaceProjectTokenLocked", true),
				)
				.await
			}
			ChargedTokenEvent::IncreasedFullyChargedBalance { user, value } => {
				self.update_balance(
					&context,
					user,
					vec![("fullyChargedBalance", Change::Increase(value))],
				)
				.await
			}
			ChargedTokenEvent::LTAllocatedByOwner {
				user,
				value,
				has_vesting_lt,
			} => {
				let field = if has_vesting_lt {
					"partiallyChargedBalance"
				} else {
					"fullyChargedBalance"
				};
				self.update_balance(&context, user, vec![(field, Change::Increase(value))])
					.await
			}
			ChargedTokenEvent::IncreasedTotalTokenAllocated(value) => {
				self.update(
					&context,
					vec![("totalTokenAllocated", Change::Increase(value))],
				)
				.await
			}
			ChargedTokenEvent::IncreasedStakedLT(value) => {
				self.update(&context, vec![("stakedLT", Change::Increase(value))])
					.await
			}
			ChargedTokenEvent::AllocationsAreTerminated => {
				self.overwrite(&context, Delta::new().with("areAllocationsTerminated", true))
					.await
			}
			ChargedTokenEvent::DecreasedFullyChargedBalanceAndStakedLT { user, value } => {
				self.update(&context, vec![("stakedLT", Change::Decrease(value.clone()))])
					.await?;
				self.update_balance(
					&context,
					user,
					vec![("fullyChargedBalance", Change::Decrease(value))],
				)
				.await
			}
			ChargedTokenEvent::DecreasedPartiallyChargedBalance { user, value } => {
				self.update_balance(
					&context,
					user,
					vec![("partiallyChargedBalance", Change::Decrease(value))],
				)
				.await
			}
			ChargedTokenEvent::UpdatedDateOfPartiallyChargedAndDecreasedStakedLT {
				user,
				value,
			} => {
				self.on_updated_date_of_partially_charged(&context, user, value)
					.await
			}
			ChargedTokenEvent::TokensDischarged {
				user,
				partially_charged_balance,
			} => {
				self.update_balance(
					&context,
					user,
					vec![
						("fullyChargedBalance", Change::Set(json!("0"))),
						(
							"partiallyChargedBalance",
							Change::Set(json!(partially_charged_balance)),
						),
					],
				)
				.await
			}
			ChargedTokenEvent::ClaimedRewardPerShareUpdated { user, value } => {
				self.update_balance(
					&context,
					user,
					vec![("claimedRewardPerShare1e18", Change::Set(json!(value)))],
				)
				.await
			}
			ChargedTokenEvent::CurrentRewardPerShareAndStakingCheckpointUpdated {
				reward_per_share,
				block_time,
			} => {
				self.overwrite(
					&context,
					Delta::new()
						.with("currentRewardPerShare1e18", reward_per_share)
						.with("stakingDateLastCheckpoint", block_time),
				)
				.await
			}
			ChargedTokenEvent::IncreasedCurrentRewardPerShare(value) => {
				self.update(
					&context,
					vec![("currentRewardPerShare1e18", Change::Increase(value))],
				)
				.await
			}
			ChargedTokenEvent::StakingCampaignCreated {
				start_date,
				duration,
				rewards,
			} => {
				self.update(
					&context,
					vec![
						("stakingStartDate", Change::Set(json!(start_date))),
						("stakingDuration", Change::Set(json!(duration))),
						("campaignStakingRewards", Change::Set(json!(rewards.clone()))),
						("totalStakingRewards", Change::Increase(rewards)),
					],
				)
				.await
			}
			ChargedTokenEvent::FieldSet { field, value } => {
				self.overwrite(&context, Delta::new().with(field, value))
					.await
			}
			ChargedTokenEvent::FundraisingConditionsSet {
				token,
				symbol,
				price,
			} => {
				self.update_fundraising(&context, |fundraising| {
					fundraising.fundraising_token = token;
					fundraising.fundraising_token_symbol = symbol;
					fundraising.price_token_per_1e18 = price;
				})
				.await
			}
			ChargedTokenEvent::FundraisingStatusChanged(active) => {
				self.update_fundraising(&context, |fundraising| {
					fundraising.is_fundraising_active = active;
				})
				.await
			}
			ChargedTokenEvent::LTAllocatedThroughSale { user, amount_lt } => {
				self.update_balance(
					&context,
					user,
					vec![("partiallyChargedBalance", Change::Increase(amount_lt))],
				)
				.await
			}
			ChargedTokenEvent::Ignored => Ok(()),
		}
	}
}
