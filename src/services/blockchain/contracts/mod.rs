//! Contract ABIs, log decoding and view calls.
//!
//! - `abi`: static ABIs and the known-events tables
//! - `interface`: decoding of raw logs into named arguments
//! - `reader`: view calls and snapshot loading

mod abi;
mod interface;
mod reader;

pub use abi::{abi, known_events};
pub use interface::{format_value, ContractInterface, DecodedLog};
pub use reader::{ContractHandle, LiquiTokenRecord};
