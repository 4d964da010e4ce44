//! Declarative macros shared across the crate.
//!
//! The macros are exported at the crate root.

mod deserialization;
