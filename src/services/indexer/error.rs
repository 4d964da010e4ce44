//! Errors of the indexing pipeline.

use crate::{
	models::StateError,
	repositories::RepositoryError,
	utils::logging::error::{ErrorContext, TraceableError},
};
use std::{collections::HashMap, error::Error};
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(ThisError, Debug)]
pub enum IndexerError {
	/// Data would break a state invariant (negative amount, provider
	/// returning another block than asked)
	#[error("Invariant violation: {0}")]
	InvariantViolation(ErrorContext),

	/// Duplicate or unknown contract in the registration graph
	#[error("Registration error: {0}")]
	RegistrationError(ErrorContext),

	/// Log or call output that cannot be decoded
	#[error("Decode error: {0}")]
	DecodeError(ErrorContext),

	#[error("Chain error: {0}")]
	ChainError(ErrorContext),

	#[error("Storage error: {0}")]
	StorageError(ErrorContext),

	/// A handler could not apply an event
	#[error("Handler error: {0}")]
	HandlerError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl IndexerError {
	pub fn invariant_violation(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvariantViolation(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn registration_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RegistrationError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn decode_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::DecodeError(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// Not logged at construction: the loader decides whether the failure is
	/// a warning (range not available yet) or an error.
	pub fn chain_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ChainError(ErrorContext::new(msg, source, metadata))
	}

	pub fn storage_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StorageError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn handler_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::HandlerError(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// Configuration or data-integrity bugs; retrying cannot help
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::InvariantViolation(_) | Self::RegistrationError(_)
		)
	}

	fn context(&self) -> Option<&ErrorContext> {
		match self {
			Self::InvariantViolation(ctx)
			| Self::RegistrationError(ctx)
			| Self::DecodeError(ctx)
			| Self::ChainError(ctx)
			| Self::StorageError(ctx)
			| Self::HandlerError(ctx) => Some(ctx),
			Self::Other(_) => None,
		}
	}

	/// This error's message followed by the message of every source
	pub fn chain_text(&self) -> String {
		let mut text = self.to_string();
		let mut source = match self {
			Self::Other(error) => error.source(),
			_ => self.context().and_then(|ctx| ctx.source()),
		};
		while let Some(error) = source {
			text.push_str(": ");
			text.push_str(&error.to_string());
			source = error.source();
		}
		text
	}
}

impl From<RepositoryError> for IndexerError {
	fn from(error: RepositoryError) -> Self {
		Self::storage_error("State repository failure", Some(Box::new(error)), None)
	}
}

impl From<StateError> for IndexerError {
	fn from(error: StateError) -> Self {
		match error {
			StateError::NegativeAmount { .. } => {
				Self::invariant_violation("Negative amount rejected", Some(Box::new(error)), None)
			}
			other => Self::handler_error("Invalid state update", Some(Box::new(other)), None),
		}
	}
}

impl TraceableError for IndexerError {
	fn trace_id(&self) -> String {
		match self {
			Self::InvariantViolation(ctx) => ctx.trace_id.clone(),
			Self::RegistrationError(ctx) => ctx.trace_id.clone(),
			Self::DecodeError(ctx) => ctx.trace_id.clone(),
			Self::ChainError(ctx) => ctx.trace_id.clone(),
			Self::StorageError(ctx) => ctx.trace_id.clone(),
			Self::HandlerError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
