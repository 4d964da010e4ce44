//! Chain-level data structures.
//!
//! - `block`: block headers as returned by `eth_getBlockByNumber`
//! - `log`: raw event logs as returned by `eth_getLogs`

mod block;
mod log;

pub use block::BlockHeader;
pub use log::{sort_logs, ChainLog, LogPosition};
