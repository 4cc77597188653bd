pub mod adapter;
pub mod bundle;
pub mod config;
pub mod console;
pub mod error;
pub mod lazy;
pub mod mount;
pub mod registry;
pub mod storage;
pub mod utils;

pub use bundle::{BundleBuilder, StorageBundle};
pub use crate::config::{BundleConfig, StorageConfig};
pub use lazy::{LazyStorageHandle, resolve};
pub use registry::StorageRegistry;
pub use storage::{Storage, Visibility};
