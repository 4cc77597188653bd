//! Lazy storage support
//!
//! Storages declared with the `lazy` adapter are bound to another storage by
//! name and resolved on first use.

pub mod handle;
pub mod resolver;

pub use handle::{LazyStorageHandle, StorageCell, StorageConstructor};
pub use resolver::{MAX_RESOLUTION_DEPTH, resolve};
