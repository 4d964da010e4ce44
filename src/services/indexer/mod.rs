//! Contract-graph synchronization.
//!
//! - `graph`: in-memory registration graph and project token reference counts
//! - `registry`: registration and unregistration walks
//! - `repository`: the [`BlockchainRepository`] façade through which every
//!   state change flows
//! - `listener`: decode, record and apply one log
//! - `loader`: block-range polling behind the head

mod error;
mod graph;
mod listener;
mod loader;
mod registry;
mod repository;

pub use error::IndexerError;
pub use graph::{RegisteredContract, RegistrationGraph};
pub use listener::{EventListener, EventOutcome};
pub use loader::{is_block_not_ready_error, EventsLoader};
pub use registry::ContractsRegistry;
pub use repository::BlockchainRepository;
