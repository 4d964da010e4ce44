//! Secret handling for configuration values.
//!
//! - `error`: Error types for secret resolution
//! - `secret`: Zeroizing secret containers

mod error;
mod secret;

pub use error::{SecurityError, SecurityResult};
pub use secret::{SecretString, SecretValue};
