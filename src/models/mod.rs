//! Domain models and data structures for the indexer.
//!
//! - `blockchain`: Raw chain data (block headers, logs)
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (Network)
//! - `security`: Security models (Secret)
//! - `state`: Mirrored contract snapshots, balances and event records

mod blockchain;
mod config;
mod core;
mod security;
mod state;

// Re-export blockchain types
pub use blockchain::{sort_logs, BlockHeader, ChainLog, LogPosition};

// Re-export core types
pub use core::{Network, RpcUrl};

// Re-export config types
pub use config::{ConfigError, ConfigLoader};

// Re-export security types
pub use security::{SecretString, SecretValue, SecurityError, SecurityResult};

// Re-export state types
pub use state::{
	add_amounts, format_address, is_negative_amount, is_zero_amount, merge_document,
	parse_amount, sub_amounts, Amount, ChargedTokenSnapshot, ContractKind, ContractSnapshot,
	DelegableToLTSnapshot, Delta, DirectorySnapshot, EventKey, EventRecord, EventStatus,
	FundraisingState, InterfaceProjectTokenSnapshot, StateError, UserBalance,
	BALANCE_NUMERIC_FIELDS,
};
