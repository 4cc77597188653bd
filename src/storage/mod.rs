//! Storage capability and built-in adapters
//!
//! Defines the `Storage` trait, the `Filesystem` wrapper and the adapters the
//! bundle can build without host help.

pub mod filesystem;
pub mod local;
pub mod memory;
pub mod validation;

pub use filesystem::{Filesystem, FilesystemOptions, Storage, Visibility};
pub use local::LocalAdapter;
pub use memory::MemoryAdapter;
