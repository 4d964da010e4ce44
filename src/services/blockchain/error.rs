//! Errors of the chain access layer.
//!
//! RPC calls themselves report `anyhow` errors through [`ChainClient`]; this
//! type covers the creation and caching of clients.
//!
//! [`ChainClient`]: crate::services::blockchain::ChainClient

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(ThisError, Debug)]
pub enum BlockChainError {
	/// Client could not be created or fetched from the pool
	#[error("Client pool error: {0}")]
	ClientPoolError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl BlockChainError {
	pub fn client_pool_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ClientPoolError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for BlockChainError {
	fn trace_id(&self) -> String {
		match self {
			Self::ClientPoolError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
