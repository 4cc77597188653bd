//! Error types
//!
//! Defines domain-specific error types for each module of the storage bundle.

use std::fmt;
use std::io;

/// Storage capability errors, raised by adapters and the filesystem wrapper
#[derive(Debug)]
pub enum StorageError {
    FileNotFound(String),
    FileAlreadyExists(String),
    InvalidPath(String),
    PathTraversal(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::FileAlreadyExists(p) => write!(f, "File already exists: {}", p),
            StorageError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            StorageError::PathTraversal(p) => write!(f, "Path traversal attempt: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Adapter definition and construction errors
#[derive(Debug)]
pub enum AdapterError {
    InvalidOptions { kind: String, reason: String },
    Construction { kind: String, reason: String },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::InvalidOptions { kind, reason } => {
                write!(f, "Invalid options for adapter '{}': {}", kind, reason)
            }
            AdapterError::Construction { kind, reason } => {
                write!(f, "Failed to construct adapter '{}': {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for AdapterError {}

/// Registration errors, raised while the registry is being populated
#[derive(Debug)]
pub enum RegistryError {
    DuplicateStorage(String),
    InvalidName(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateStorage(name) => {
                write!(f, "Storage '{}' is already registered", name)
            }
            RegistryError::InvalidName(msg) => write!(f, "Invalid storage name: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Resolution errors, raised on first use of a storage
#[derive(Debug)]
pub enum ResolveError {
    StorageNotFound(String),
    UnknownSource { storage: String, source_name: String },
    CyclicResolution { chain: Vec<String> },
    ResolutionDepthExceeded { storage: String, limit: usize },
    Adapter(AdapterError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::StorageNotFound(name) => write!(f, "Storage not found: {}", name),
            ResolveError::UnknownSource {
                storage,
                source_name,
            } => write!(
                f,
                "Lazy storage '{}' refers to unknown source '{}'",
                storage, source_name
            ),
            ResolveError::CyclicResolution { chain } => {
                write!(f, "Cyclic lazy storage resolution: {}", chain.join(" -> "))
            }
            ResolveError::ResolutionDepthExceeded { storage, limit } => write!(
                f,
                "Resolving lazy storage '{}' exceeded the maximum chain depth of {}",
                storage, limit
            ),
            ResolveError::Adapter(e) => write!(f, "Adapter error: {}", e),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<AdapterError> for ResolveError {
    fn from(error: AdapterError) -> Self {
        ResolveError::Adapter(error)
    }
}

/// Mount manager errors
#[derive(Debug)]
pub enum MountError {
    InvalidPath(String),
    UnknownPrefix(String),
    DuplicatePrefix(String),
    Resolve(ResolveError),
    Storage(StorageError),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::InvalidPath(p) => {
                write!(f, "Invalid mount path (expected prefix://path): {}", p)
            }
            MountError::UnknownPrefix(p) => write!(f, "No storage mounted under prefix: {}", p),
            MountError::DuplicatePrefix(p) => write!(f, "Prefix already mounted: {}", p),
            MountError::Resolve(e) => write!(f, "{}", e),
            MountError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MountError {}

impl From<ResolveError> for MountError {
    fn from(error: ResolveError) -> Self {
        MountError::Resolve(error)
    }
}

impl From<StorageError> for MountError {
    fn from(error: StorageError) -> Self {
        MountError::Storage(error)
    }
}

/// General bundle error that encompasses all error types
#[derive(Debug)]
pub enum BundleError {
    Config(config::ConfigError),
    Registry(RegistryError),
    Resolve(ResolveError),
    Adapter(AdapterError),
    Mount(MountError),
    UnknownAdapter { storage: String, adapter: String },
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Config(e) => write!(f, "Configuration error: {}", e),
            BundleError::Registry(e) => write!(f, "Registry error: {}", e),
            BundleError::Resolve(e) => write!(f, "Resolution error: {}", e),
            BundleError::Adapter(e) => write!(f, "Adapter error: {}", e),
            BundleError::Mount(e) => write!(f, "Mount error: {}", e),
            BundleError::UnknownAdapter { storage, adapter } => write!(
                f,
                "Storage '{}' uses adapter '{}' which is neither built in nor registered",
                storage, adapter
            ),
        }
    }
}

impl std::error::Error for BundleError {}

// Implement conversions from specific errors to BundleError
impl From<config::ConfigError> for BundleError {
    fn from(error: config::ConfigError) -> Self {
        BundleError::Config(error)
    }
}

impl From<RegistryError> for BundleError {
    fn from(error: RegistryError) -> Self {
        BundleError::Registry(error)
    }
}

impl From<ResolveError> for BundleError {
    fn from(error: ResolveError) -> Self {
        BundleError::Resolve(error)
    }
}

impl From<AdapterError> for BundleError {
    fn from(error: AdapterError) -> Self {
        BundleError::Adapter(error)
    }
}

impl From<MountError> for BundleError {
    fn from(error: MountError) -> Self {
        BundleError::Mount(error)
    }
}
