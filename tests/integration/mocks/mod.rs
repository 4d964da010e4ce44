//! Mock implementations for testing purposes.
//!
//! This module contains mock implementations of the traits the indexer
//! depends on, primarily for testing. It includes mocks for:
//! - The chain client
//! - The state repository
//! - The notification broker and the job scheduler
//! - Blockchain transports
//!
//! The mocks are implemented using the `mockall` crate.

mod repositories;
#[allow(unused_imports)]
pub use clients::*;
#[allow(unused_imports)]
pub use models::*;
#[allow(unused_imports)]
pub use repositories::*;
#[allow(unused_imports)]
pub use services::*;
#[allow(unused_imports)]
pub use transports::*;
