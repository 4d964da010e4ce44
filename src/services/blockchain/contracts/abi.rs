//! Static ABIs of the four contract kinds.
//!
//! Each ABI is written in human-readable form and parsed once. The
//! known-events table maps an event selector to its definition for every
//! kind; logs whose selector is absent from their kind's table are ignored.

use alloy::{
	json_abi::{Event, JsonAbi},
	primitives::B256,
};
use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::models::ContractKind;

const DIRECTORY_ABI: &[&str] = &[
	"function owner() view returns (address)",
	"function areUserFunctionsDisabled() view returns (bool)",
	"function countLTContracts() view returns (uint256)",
	"function getLTContract(uint256 index) view returns (address)",
	"function countWhitelistedProjectOwners() view returns (uint256)",
	"function getWhitelistedProjectOwner(uint256 index) view returns (address)",
	"function whitelist(address projectOwner) view returns (string)",
	"function projectRelatedToLT(address contractAddress) view returns (string)",
	"event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)",
	"event UserFunctionsAreDisabled(bool areUserFunctionsDisabled)",
	"event ProjectOwnerWhitelisted(address indexed projectOwner, string projectName)",
	"event AddedLTContract(address indexed contractAddress, string projectName)",
	"event RemovedLTContract(address indexed contractAddress)",
	"event RemovedProjectByAdmin(address indexed projectOwner)",
	"event ChangedProjectOwnerAccount(address indexed projectOwnerOld, address indexed projectOwnerNew)",
	"event ChangedProjectName(string oldProjectName, string newProjectName)",
	"event AllocatedLTToProject(address indexed contractAddress, string projectName)",
	"event AllocatedProjectOwnerToProject(address indexed projectOwner, string projectName)",
];

const CHARGED_TOKEN_ABI: &[&str] = &[
	"function owner() view returns (address)",
	"function name() view returns (string)",
	"function symbol() view returns (string)",
	"function decimals() view returns (uint8)",
	"function totalSupply() view returns (uint256)",
	"function balanceOf(address account) view returns (uint256)",
	"function fractionInitialUnlockPerThousand() view returns (uint256)",
	"function durationCliff() view returns (uint256)",
	"function durationLinearVesting() view returns (uint256)",
	"function maxInitialTokenAllocation() view returns (uint256)",
	"function maxWithdrawFeesPerThousandForLT() view returns (uint256)",
	"function maxClaimFeesPerThousandForPT() view returns (uint256)",
	"function maxStakingAPR() view returns (uint256)",
	"function maxStakingTokenAmount() view returns (uint256)",
	"function stakingStartDate() view returns (uint256)",
	"function stakingDuration() view returns (uint256)",
	"function stakingDateLastCheckpoint() view returns (uint256)",
	"function campaignStakingRewards() view returns (uint256)",
	"function totalStakingRewards() view returns (uint256)",
	"function areUserFunctionsDisabled() view returns (bool)",
	"function isInterfaceProjectTokenLocked() view returns (bool)",
	"function areAllocationsTerminated() view returns (bool)",
	"function withdrawFeesPerThousandForLT() view returns (uint256)",
	"function ratioFeesToRewardHodlersPerThousand() view returns (uint256)",
	"function currentRewardPerShare1e18() view returns (uint256)",
	"function stakedLT() view returns (uint256)",
	"function totalTokenAllocated() view returns (uint256)",
	"function interfaceProjectToken() view returns (address)",
	"function userLiquiToken(address user) view returns (uint256 fullyChargedBalance, uint256 partiallyChargedBalance, uint256 dateOfPartiallyCharged, uint256 claimedRewardPerShare1e18)",
	"function isFundraisingContract() view returns (bool)",
	"function isFundraisingActive() view returns (bool)",
	"function fundraisingToken() view returns (address)",
	"function fundraisingTokenSymbol() view returns (string)",
	"function priceTokenPer1e18() view returns (uint256)",
	"function fundraisingFeesPerThousand() view returns (uint256)",
	"event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)",
	"event Transfer(address indexed from, address indexed to, uint256 value)",
	"event Approval(address indexed owner, address indexed spender, uint256 value)",
	"event UserFunctionsAreDisabled(bool areUserFunctionsDisabled)",
	"event InterfaceProjectTokenSet(address interfaceProjectToken)",
	"event InterfaceProjectTokenIsLocked()",
	"event IncreasedFullyChargedBalance(address indexed user, uint256 value)",
	"event LTAllocatedByOwner(address indexed user, uint256 value, bool hasVestingLT)",
	"event IncreasedTotalTokenAllocated(uint256 value)",
	"event IncreasedStakedLT(uint256 value)",
	"event AllocationsAreTerminated()",
	"event DecreasedFullyChargedBalanceAndStakedLT(address indexed user, uint256 value)",
	"event DecreasedPartiallyChargedBalance(address indexed user, uint256 value)",
	"event UpdatedDateOfPartiallyChargedAndDecreasedStakedLT(address indexed user, uint256 value)",
	"event TokensDischarged(address indexed user, uint256 partiallyChargedBalance)",
	"event ClaimedRewardPerShareUpdated(address indexed user, uint256 value)",
	"event CurrentRewardPerShareAndStakingCheckpointUpdated(uint256 rewardPerShare1e18, uint256 blockTime)",
	"event IncreasedCurrentRewardPerShare(uint256 value)",
	"event LTReceived(address indexed user, uint256 value)",
	"event LTDeposited(address indexed user, uint256 value)",
	"event StakingCampaignCreated(uint256 startDate, uint256 duration, uint256 rewards)",
	"event WithdrawalFeesPerThousandForLTSet(uint256 value)",
	"event RatioFeesToRewardHodlersPerThousandSet(uint256 value)",
	"event FractionInitialUnlockPerThousandSet(uint256 value)",
	"event DurationCliffSet(uint256 value)",
	"event DurationLinearVestingSet(uint256 value)",
	"event FundraisingConditionsSet(address token, string symbol, uint256 price)",
	"event FundraisingStatusChanged(bool isActive)",
	"event LTAllocatedThroughSale(address indexed user, uint256 amountLT, uint256 amountPayment, uint256 fees)",
];

const INTERFACE_PROJECT_TOKEN_ABI: &[&str] = &[
	"function owner() view returns (address)",
	"function liquidityToken() view returns (address)",
	"function projectToken() view returns (address)",
	"function dateLaunch() view returns (uint256)",
	"function dateEndCliff() view returns (uint256)",
	"function claimFeesPerThousandForPT() view returns (uint256)",
	"function valueProjectTokenToFullRecharge(address user) view returns (uint256)",
	"event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)",
	"event StartSet(uint256 dateLaunch, uint256 dateEndCliff)",
	"event ProjectTokenReceived(address indexed user, uint256 value, uint256 fees, uint256 hodlRewards)",
	"event IncreasedValueProjectTokenToFullRecharge(address indexed user, uint256 valueIncreased)",
	"event LTRecharged(address indexed user, uint256 value, uint256 valueProjectToken, uint256 valueDecreased)",
	"event ClaimFeesUpdated(uint256 valuePerThousand)",
];

const DELEGABLE_TO_LT_ABI: &[&str] = &[
	"function owner() view returns (address)",
	"function name() view returns (string)",
	"function symbol() view returns (string)",
	"function decimals() view returns (uint8)",
	"function totalSupply() view returns (uint256)",
	"function balanceOf(address account) view returns (uint256)",
	"function countValidatedInterfaceProjectToken() view returns (uint256)",
	"function getValidatedInterfaceProjectToken(uint256 index) view returns (address)",
	"function isListOfInterfaceProjectTokenComplete() view returns (bool)",
	"event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)",
	"event Transfer(address indexed from, address indexed to, uint256 value)",
	"event Approval(address indexed owner, address indexed spender, uint256 value)",
	"event AddedInterfaceProjectToken(address interfaceProjectToken)",
	"event ListOfValidatedInterfaceProjectTokenIsFinalized()",
	"event InterfaceProjectTokenRemoved(address interfaceProjectToken)",
];

fn signatures(kind: ContractKind) -> &'static [&'static str] {
	match kind {
		ContractKind::Directory => DIRECTORY_ABI,
		ContractKind::ChargedToken => CHARGED_TOKEN_ABI,
		ContractKind::InterfaceProjectToken => INTERFACE_PROJECT_TOKEN_ABI,
		ContractKind::DelegableToLT => DELEGABLE_TO_LT_ABI,
	}
}

fn parse_abi(kind: ContractKind) -> JsonAbi {
	JsonAbi::parse(signatures(kind).iter().copied()).unwrap_or_else(|e| {
		tracing::error!("Invalid {} ABI: {}", kind, e);
		JsonAbi::new()
	})
}

lazy_static! {
	static ref ABIS: HashMap<ContractKind, JsonAbi> = ContractKind::ALL
		.iter()
		.map(|kind| (*kind, parse_abi(*kind)))
		.collect();
	static ref KNOWN_EVENTS: HashMap<ContractKind, HashMap<B256, Event>> = ABIS
		.iter()
		.map(|(kind, abi)| {
			let events = abi
				.events()
				.map(|event| (event.selector(), event.clone()))
				.collect();
			(*kind, events)
		})
		.collect();
}

/// Parsed ABI of `kind`
pub fn abi(kind: ContractKind) -> &'static JsonAbi {
	&ABIS[&kind]
}

/// Selector to event table of `kind`
pub fn known_events(kind: ContractKind) -> &'static HashMap<B256, Event> {
	&KNOWN_EVENTS[&kind]
}
