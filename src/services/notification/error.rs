//! Errors of the update broker.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum NotificationError {
	/// Nobody was subscribed when the update was published
	#[error("Update dropped: {0}")]
	NoSubscriber(Box<ErrorContext>),
}

impl NotificationError {
	/// Not logged at construction: having no subscriber is a normal state
	pub fn no_subscriber(topic: impl Into<String>, key: impl Into<String>) -> Self {
		let metadata = HashMap::from([
			("topic".to_string(), topic.into()),
			("key".to_string(), key.into()),
		]);
		Self::NoSubscriber(Box::new(ErrorContext::new(
			"No subscriber",
			None,
			Some(metadata),
		)))
	}
}

impl TraceableError for NotificationError {
	fn trace_id(&self) -> String {
		match self {
			Self::NoSubscriber(ctx) => ctx.trace_id.clone(),
		}
	}
}
