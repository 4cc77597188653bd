//! Registry entries
//!
//! A `StorageCell` holds a concrete storage (ready, or built on first use).
//! A `LazyStorageHandle` holds a storage that defers to another one by name.
//! Both bind their slot once and keep it for the life of the registry.

use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::error::AdapterError;
use crate::storage::Storage;

/// Constructor for a concrete storage that is built on first use
pub type StorageConstructor = Box<dyn Fn() -> Result<Arc<dyn Storage>, AdapterError> + Send + Sync>;

/// Concrete registry entry
pub struct StorageCell {
    name: String,
    slot: OnceLock<Arc<dyn Storage>>,
    constructor: Option<StorageConstructor>,
    init: Mutex<()>,
}

impl StorageCell {
    /// A cell holding an already built storage.
    pub fn ready(name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            name: name.into(),
            slot: OnceLock::from(storage),
            constructor: None,
            init: Mutex::new(()),
        }
    }

    /// A cell whose storage is built by `constructor` the first time it is
    /// requested. A failed construction leaves the cell empty.
    pub fn deferred(name: impl Into<String>, constructor: StorageConstructor) -> Self {
        Self {
            name: name.into(),
            slot: OnceLock::new(),
            constructor: Some(constructor),
            init: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Returns the storage, building it if this is the first request.
    pub fn get(&self) -> Result<Arc<dyn Storage>, AdapterError> {
        if let Some(storage) = self.slot.get() {
            return Ok(Arc::clone(storage));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(storage) = self.slot.get() {
            return Ok(Arc::clone(storage));
        }

        // Cells without a constructor are created with a filled slot.
        let constructor = self.constructor.as_ref().ok_or_else(|| AdapterError::Construction {
            kind: self.name.clone(),
            reason: "storage has neither a value nor a constructor".into(),
        })?;

        debug!("Constructing storage '{}'", self.name);
        let storage = constructor()?;
        Ok(Arc::clone(self.slot.get_or_init(|| storage)))
    }
}

impl fmt::Debug for StorageCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCell")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// A storage declared with `source = <other storage>`
pub struct LazyStorageHandle {
    name: String,
    source_name: String,
    resolved: OnceLock<Arc<dyn Storage>>,
    resolving: Mutex<()>,
}

impl LazyStorageHandle {
    pub fn new(name: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_name: source_name.into(),
            resolved: OnceLock::new(),
            resolving: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The bound storage, if this handle has been resolved.
    pub fn resolved(&self) -> Option<Arc<dyn Storage>> {
        self.resolved.get().map(Arc::clone)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Binds the handle unless it is already bound, then returns the bound
    /// storage. The first binding wins.
    pub(crate) fn bind(&self, storage: &Arc<dyn Storage>) -> Arc<dyn Storage> {
        Arc::clone(self.resolved.get_or_init(|| Arc::clone(storage)))
    }

    /// Serializes first-time resolution of this handle.
    pub(crate) fn lock_resolution(&self) -> MutexGuard<'_, ()> {
        self.resolving.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for LazyStorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyStorageHandle")
            .field("name", &self.name)
            .field("source_name", &self.source_name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
