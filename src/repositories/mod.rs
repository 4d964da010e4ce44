//! Repository implementations.
//!
//! - Network: loads network configurations defining the chain connection,
//!   the root Directory and the loader parameters
//! - State: stores contract snapshots, user balances, the event log and
//!   the loader checkpoint, with session-scoped writes

mod error;
mod network;
mod state;

pub use error::RepositoryError;
pub use network::{NetworkRepository, NetworkRepositoryTrait, NetworkService};
pub use state::{MemoryStateRepository, Session, StateRepository};
