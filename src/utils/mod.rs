//! Helpers shared by the indexer services.
//!
//! Client caching, retryable HTTP clients, logging setup, Prometheus metrics,
//! CLI parsing and the builders and fakes used by tests.

mod cron_utils;

pub mod client_storage;
pub mod constants;
pub mod http;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod parsing;

pub use client_storage::ClientStorage;
pub use constants::*;
pub use cron_utils::*;
pub use http::*;
pub use parsing::*;
