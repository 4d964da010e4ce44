//! Errors raised while manipulating state documents.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum StateError {
	/// A delta tried to write a field the document does not have
	#[error("Unknown field '{0}'")]
	UnknownField(String),

	/// A numeric field would be persisted with a negative value
	#[error("Negative value '{value}' for field '{field}'")]
	NegativeAmount { field: String, value: String },

	/// An amount could not be parsed or overflowed
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
