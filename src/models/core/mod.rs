//! Core domain models.
//!
//! - Networks: chain connection details and indexing parameters

mod network;

pub use network::{Network, RpcUrl};
