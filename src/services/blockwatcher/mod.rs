//! Head watching and reorg detection.
//!
//! - `HeadWatcher`: polls the head of a network and broadcasts new heights
//! - `ReorgDetector`: follows the broadcast heads and reports rewritten blocks
//! - Error handling specific to both

mod error;
mod reorg;
mod service;

pub use error::BlockWatcherError;
pub use reorg::{BlockObservation, ReorgDetector};
pub use service::{poll_head, HeadWatcher, JobSchedulerTrait};
