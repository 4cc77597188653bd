//! Utilities
//!
//! Shared helpers for the binary.

pub mod logging;

pub use logging::setup_logging;
