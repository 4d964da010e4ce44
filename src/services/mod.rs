//! Core services implementing the business logic.
//!
//! This module contains the main service implementations:
//! - `blockchain`: Chain client, transports and contract bindings
//! - `blockwatcher`: Head polling and reorg detection
//! - `handlers`: Per-contract event transitions
//! - `indexer`: Registration graph, event listener and events loader
//! - `notification`: Broadcast of state updates

pub mod blockchain;
pub mod blockwatcher;
pub mod handlers;
pub mod indexer;
pub mod notification;
