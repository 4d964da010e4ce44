//! Blockchain client interfaces and implementations.
//!
//! Provides abstractions and concrete implementations for reading an EVM
//! network. Includes:
//!
//! - The chain client trait and its JSON-RPC implementation
//! - Network transport with weighted endpoint rotation
//! - Contract ABIs, log decoding and view calls
//! - Error handling for blockchain operations
//! - Client pool for sharing clients between services

mod client;
mod clients;
pub mod contracts;
mod error;
mod pool;
mod transports;

pub use client::ChainClient;
pub use clients::EvmClient;
pub use error::BlockChainError;
pub use pool::{ClientPool, ClientPoolTrait};
pub use transports::{
	BlockchainTransport, EndpointManager, HttpTransportClient, RotatingTransport,
	TransientErrorRetryStrategy, TransportError,
};
