//! Mount manager
//!
//! Dispatches `prefix://path` operations to the storage mounted under
//! `prefix`. Storages are looked up by name through the registry on every
//! call, so lazy storages resolve on first dispatch.

use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{MountError, StorageError};
use crate::registry::StorageRegistry;
use crate::storage::Storage;

const PREFIX_SEPARATOR: &str = "://";

/// Splits `prefix://path` into its prefix and path parts.
pub fn split_mount_path(path: &str) -> Result<(&str, &str), MountError> {
    match path.split_once(PREFIX_SEPARATOR) {
        Some((prefix, rest)) if !prefix.is_empty() => Ok((prefix, rest)),
        _ => Err(MountError::InvalidPath(path.to_string())),
    }
}

/// Routes prefixed paths to named storages
pub struct MountManager {
    registry: Arc<StorageRegistry>,
    mounts: BTreeMap<String, String>,
}

impl MountManager {
    pub fn new(registry: Arc<StorageRegistry>) -> Self {
        Self {
            registry,
            mounts: BTreeMap::new(),
        }
    }

    /// Mounts the storage named `storage_name` under `prefix`.
    pub fn mount(
        &mut self,
        prefix: impl Into<String>,
        storage_name: impl Into<String>,
    ) -> Result<(), MountError> {
        let prefix = prefix.into();
        let storage_name = storage_name.into();

        if prefix.is_empty() || prefix.contains(PREFIX_SEPARATOR) {
            return Err(MountError::InvalidPath(prefix));
        }
        if self.mounts.contains_key(&prefix) {
            return Err(MountError::DuplicatePrefix(prefix));
        }

        info!("Mounting storage '{}' at {}://", storage_name, prefix);
        self.mounts.insert(prefix, storage_name);
        Ok(())
    }

    /// Mounted prefixes with the storage names behind them, sorted by prefix.
    pub fn mounts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mounts
            .iter()
            .map(|(prefix, name)| (prefix.as_str(), name.as_str()))
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.mounts.keys().cloned().collect()
    }

    /// Resolves `prefix://path` to its storage and the path inside it.
    pub fn storage_for<'p>(
        &self,
        path: &'p str,
    ) -> Result<(Arc<dyn Storage>, &'p str), MountError> {
        let (prefix, rest) = split_mount_path(path)?;
        let storage_name = self
            .mounts
            .get(prefix)
            .ok_or_else(|| MountError::UnknownPrefix(prefix.to_string()))?;
        let storage = self.registry.get_storage(storage_name)?;
        Ok((storage, rest))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, MountError> {
        let (storage, path) = self.storage_for(path)?;
        Ok(storage.read(path)?)
    }

    pub fn write(&self, path: &str, contents: &[u8]) -> Result<(), MountError> {
        let (storage, path) = self.storage_for(path)?;
        Ok(storage.write(path, contents)?)
    }

    pub fn list(&self, directory: &str) -> Result<Vec<String>, MountError> {
        let (storage, directory) = self.storage_for(directory)?;
        Ok(storage.list(directory)?)
    }

    pub fn exists(&self, path: &str) -> Result<bool, MountError> {
        let (storage, path) = self.storage_for(path)?;
        Ok(storage.exists(path)?)
    }

    pub fn delete(&self, path: &str) -> Result<(), MountError> {
        let (storage, path) = self.storage_for(path)?;
        Ok(storage.delete(path)?)
    }

    /// Copies a file, possibly across storages.
    pub fn copy(&self, from: &str, to: &str) -> Result<(), MountError> {
        let contents = self.read(from)?;
        self.write(to, &contents)?;
        debug!("Copied {} to {} ({} bytes)", from, to, contents.len());
        Ok(())
    }

    /// Moves a file, possibly across storages. The source is deleted only
    /// once the copy has been written. Moving a file onto itself, through
    /// any prefix reaching the same storage, leaves it in place.
    pub fn move_file(&self, from: &str, to: &str) -> Result<(), MountError> {
        let (source, source_path) = self.storage_for(from)?;
        let (target, target_path) = self.storage_for(to)?;

        if std::ptr::addr_eq(Arc::as_ptr(&source), Arc::as_ptr(&target))
            && source.same_file(source_path, target_path)?
        {
            if !source.exists(source_path)? {
                return Err(StorageError::FileNotFound(source_path.to_string()).into());
            }
            debug!("Move of {} onto {} targets the same file, nothing to do", from, to);
            return Ok(());
        }

        let contents = source.read(source_path)?;
        target.write(target_path, &contents)?;
        source.delete(source_path)?;
        debug!("Moved {} to {}", from, to);
        Ok(())
    }
}
