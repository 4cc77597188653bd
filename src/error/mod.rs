//! Error handling
//!
//! Defines error types and handling for the storage bundle.

pub mod handlers;
pub mod types;

pub use types::*;
