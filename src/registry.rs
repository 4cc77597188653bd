//! Storage registry
//!
//! Maps storage names to concrete cells or lazy handles. Populated once at
//! startup and read concurrently afterwards.

use log::{debug, warn};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{RegistryError, ResolveError};
use crate::lazy::{LazyStorageHandle, StorageCell, StorageConstructor, resolve};
use crate::storage::Storage;

/// A registered storage
#[derive(Debug, Clone)]
pub enum StorageEntry {
    Concrete(Arc<StorageCell>),
    Lazy(Arc<LazyStorageHandle>),
}

/// Registry of named storages
#[derive(Default)]
pub struct StorageRegistry {
    entries: RwLock<HashMap<String, StorageEntry>>,
}

fn validate_name(field: &str, value: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        return Err(RegistryError::InvalidName(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, name: String, entry: StorageEntry) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(name) {
            Entry::Occupied(occupied) => {
                warn!("Rejecting duplicate storage '{}'", occupied.key());
                Err(RegistryError::DuplicateStorage(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                debug!("Registered storage '{}'", vacant.key());
                vacant.insert(entry);
                Ok(())
            }
        }
    }

    /// Registers a storage that is already built.
    pub fn register_concrete(
        &self,
        name: impl Into<String>,
        storage: Arc<dyn Storage>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        validate_name("storage name", &name)?;
        let cell = StorageCell::ready(name.clone(), storage);
        self.insert(name, StorageEntry::Concrete(Arc::new(cell)))
    }

    /// Registers a storage built by `constructor` on first use.
    pub fn register_deferred(
        &self,
        name: impl Into<String>,
        constructor: StorageConstructor,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        validate_name("storage name", &name)?;
        let cell = StorageCell::deferred(name.clone(), constructor);
        self.insert(name, StorageEntry::Concrete(Arc::new(cell)))
    }

    /// Registers a lazy storage deferring to `source_name`. The source does
    /// not need to be registered yet; nothing is resolved here.
    pub fn create_lazy(
        &self,
        name: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Result<Arc<LazyStorageHandle>, RegistryError> {
        let name = name.into();
        let source_name = source_name.into();
        validate_name("storage name", &name)?;
        validate_name("lazy storage source", &source_name)?;

        let handle = Arc::new(LazyStorageHandle::new(name.clone(), source_name));
        self.insert(name, StorageEntry::Lazy(Arc::clone(&handle)))?;
        Ok(handle)
    }

    /// Alias of [`StorageRegistry::create_lazy`] for wiring code.
    pub fn register_lazy(
        &self,
        name: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Result<Arc<LazyStorageHandle>, RegistryError> {
        self.create_lazy(name, source_name)
    }

    pub fn entry(&self, name: &str) -> Option<StorageEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    pub fn lazy_handle(&self, name: &str) -> Option<Arc<LazyStorageHandle>> {
        match self.entry(name) {
            Some(StorageEntry::Lazy(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Resolves a lazy handle against this registry.
    pub fn resolve(&self, handle: &LazyStorageHandle) -> Result<Arc<dyn Storage>, ResolveError> {
        resolve(handle, self)
    }

    /// Looks up a storage by name, building or resolving it on first use.
    pub fn get_storage(&self, name: &str) -> Result<Arc<dyn Storage>, ResolveError> {
        match self.entry(name) {
            Some(StorageEntry::Concrete(cell)) => Ok(cell.get()?),
            Some(StorageEntry::Lazy(handle)) => resolve(&handle, self),
            None => Err(ResolveError::StorageNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
