//! In-memory adapter
//!
//! Keeps files in a sorted map. Directories are implicit: a directory exists
//! as long as some file lives below it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use crate::error::StorageError;
use crate::storage::filesystem::{Storage, Visibility};
use crate::storage::validation::{normalize_file_path, normalize_path};

struct MemoryFile {
    contents: Vec<u8>,
    visibility: Visibility,
}

/// Adapter storing files in process memory
#[derive(Default)]
pub struct MemoryAdapter {
    files: RwLock<BTreeMap<String, MemoryFile>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn directory_prefix(directory: &str) -> String {
    if directory.is_empty() {
        String::new()
    } else {
        format!("{}/", directory)
    }
}

impl Storage for MemoryAdapter {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalize_file_path(path)?;
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files
            .get(&path)
            .map(|file| file.contents.clone())
            .ok_or(StorageError::FileNotFound(path))
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let visibility = files
            .get(&path)
            .map(|file| file.visibility)
            .unwrap_or(Visibility::Public);
        files.insert(
            path,
            MemoryFile {
                contents: contents.to_vec(),
                visibility,
            },
        );
        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, StorageError> {
        let prefix = directory_prefix(&normalize_path(directory)?);
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);

        let mut entries = BTreeSet::new();
        for key in files.keys().filter(|key| key.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => entries.insert(format!("{}/", dir)),
                None => entries.insert(rest.to_string()),
            };
        }
        Ok(entries.into_iter().collect())
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = normalize_path(path)?;
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        if path.is_empty() || files.contains_key(&path) {
            return Ok(true);
        }
        let prefix = directory_prefix(&path);
        Ok(files.keys().any(|key| key.starts_with(&prefix)))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(StorageError::FileNotFound(path)),
        }
    }

    fn visibility(&self, path: &str) -> Result<Visibility, StorageError> {
        let path = normalize_file_path(path)?;
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files
            .get(&path)
            .map(|file| file.visibility)
            .ok_or(StorageError::FileNotFound(path))
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(&path) {
            Some(file) => {
                file.visibility = visibility;
                Ok(())
            }
            None => Err(StorageError::FileNotFound(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_delete() {
        let adapter = MemoryAdapter::new();
        adapter.write("a/b.txt", b"data").unwrap();
        assert_eq!(adapter.read("a/b.txt").unwrap(), b"data");

        adapter.delete("a/b.txt").unwrap();
        assert!(!adapter.exists("a/b.txt").unwrap());
        assert!(matches!(
            adapter.delete("a/b.txt"),
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_list_groups_subdirectories() {
        let adapter = MemoryAdapter::new();
        adapter.write("top.txt", b"").unwrap();
        adapter.write("dir/one.txt", b"").unwrap();
        adapter.write("dir/two.txt", b"").unwrap();
        adapter.write("dir/nested/three.txt", b"").unwrap();

        assert_eq!(adapter.list("").unwrap(), vec!["dir/", "top.txt"]);
        assert_eq!(
            adapter.list("dir").unwrap(),
            vec!["nested/", "one.txt", "two.txt"]
        );
        assert!(adapter.list("nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_implicit_directories_exist() {
        let adapter = MemoryAdapter::new();
        adapter.write("dir/file.txt", b"").unwrap();
        assert!(adapter.exists("dir").unwrap());
        assert!(adapter.exists("/").unwrap());
        assert!(!adapter.exists("di").unwrap());
    }

    #[test]
    fn test_overwrite_keeps_visibility() {
        let adapter = MemoryAdapter::new();
        adapter.write("f", b"1").unwrap();
        adapter.set_visibility("f", Visibility::Private).unwrap();
        adapter.write("f", b"2").unwrap();
        assert_eq!(adapter.visibility("f").unwrap(), Visibility::Private);
    }

    #[test]
    fn test_traversal_rejected() {
        let adapter = MemoryAdapter::new();
        assert!(matches!(
            adapter.write("../escape", b""),
            Err(StorageError::PathTraversal(_))
        ));
    }
}
