//! Charged token state indexer.
//!
//! This library mirrors the on-chain state of the Charged token contract family
//! (Directory, ChargedToken, InterfaceProjectToken, DelegableToLT) and of their
//! user balances into a state store, and publishes every change. It includes:
//!
//! - Network configuration management through JSON files
//! - A registration graph discovered from a root Directory contract
//! - Ordered, idempotent application of contract events by block range
//! - Chain reorganization detection
//!
//! # Module Structure
//!
//! - `bootstrap`: Bootstraps the indexing pipelines
//! - `models`: Configuration, chain data and mirrored state
//! - `repositories`: Network configuration and state storage
//! - `services`: Chain access, head watching, indexing and notifications
//! - `utils`: Common utilities and helper functions

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
