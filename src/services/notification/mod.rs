//! Publication of state updates.
//!
//! The indexer reports every persisted snapshot and balance change through
//! a [`NotificationBroker`]; [`BroadcastBroker`] fans them out to in-process
//! subscribers.

mod broker;
mod error;

pub use broker::{
	BroadcastBroker, NotificationBroker, UpdateNotification, UpdateTopic,
};
pub use error::NotificationError;
