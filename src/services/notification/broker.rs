//! Broadcast of state updates.
//!
//! Every snapshot or balance write is published as an [`UpdateNotification`]
//! carrying the full document. Delivery is best effort: a notification sent
//! while nobody listens is dropped, and slow subscribers lose the oldest
//! entries of their queue.

use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

use crate::{models::ContractKind, services::notification::NotificationError};

/// Channel an update is published on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateTopic {
	Directory,
	ChargedToken,
	InterfaceProjectToken,
	DelegableToLT,
	UserBalance,
}

impl From<ContractKind> for UpdateTopic {
	fn from(kind: ContractKind) -> Self {
		match kind {
			ContractKind::Directory => UpdateTopic::Directory,
			ContractKind::ChargedToken => UpdateTopic::ChargedToken,
			ContractKind::InterfaceProjectToken => UpdateTopic::InterfaceProjectToken,
			ContractKind::DelegableToLT => UpdateTopic::DelegableToLT,
		}
	}
}

impl fmt::Display for UpdateTopic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			UpdateTopic::Directory => "Directory",
			UpdateTopic::ChargedToken => "ChargedToken",
			UpdateTopic::InterfaceProjectToken => "InterfaceProjectToken",
			UpdateTopic::DelegableToLT => "DelegableToLT",
			UpdateTopic::UserBalance => "UserBalance",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNotification {
	pub topic: UpdateTopic,
	pub chain_id: u64,
	/// Contract address, or `contract:user` for balances
	pub key: String,
	/// The whole document after the update
	pub payload: Value,
}

/// Sink of state updates
pub trait NotificationBroker: Send + Sync {
	fn notify_update(&self, topic: UpdateTopic, chain_id: u64, key: &str, payload: Value);
}

/// In-process broker over a tokio broadcast channel
pub struct BroadcastBroker {
	sender: broadcast::Sender<UpdateNotification>,
}

impl BroadcastBroker {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<UpdateNotification> {
		self.sender.subscribe()
	}

	/// Returns the number of subscribers reached
	pub fn publish(&self, notification: UpdateNotification) -> Result<usize, NotificationError> {
		let (topic, key) = (notification.topic, notification.key.clone());
		self.sender
			.send(notification)
			.map_err(|_| NotificationError::no_subscriber(topic.to_string(), key))
	}
}

impl NotificationBroker for BroadcastBroker {
	fn notify_update(&self, topic: UpdateTopic, chain_id: u64, key: &str, payload: Value) {
		let notification = UpdateNotification {
			topic,
			chain_id,
			key: key.to_string(),
			payload,
		};
		match self.publish(notification) {
			Ok(receivers) => {
				tracing::trace!(%topic, chain_id, key, receivers, "Update published");
			}
			Err(e) => {
				tracing::trace!(%topic, chain_id, key, "Update dropped: {}", e);
			}
		}
	}
}
