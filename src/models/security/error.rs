//! Errors raised while resolving secret values.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

pub type SecurityResult<T> = Result<T, Box<SecurityError>>;

/// Failure to resolve a [`SecretValue`](super::SecretValue).
#[derive(ThisError, Debug)]
pub enum SecurityError {
	/// The environment variable named by the secret is unset or not UTF-8
	#[error("Missing secret: {0}")]
	MissingSecret(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl SecurityError {
	/// Logged on creation: the variable name is kept, never its value
	pub fn missing_secret(variable: &str, source: std::env::VarError) -> Self {
		Self::MissingSecret(ErrorContext::new_with_log(
			format!("Failed to get environment variable {}", variable),
			Some(Box::new(source)),
			Some(HashMap::from([(
				"variable".to_string(),
				variable.to_string(),
			)])),
		))
	}
}

impl TraceableError for SecurityError {
	fn trace_id(&self) -> String {
		match self {
			Self::MissingSecret(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
