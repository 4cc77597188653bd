//! Storage capability and filesystem wrapper
//!
//! `Storage` is the capability every adapter implements. `Filesystem` wraps an
//! adapter with the per-storage options declared in configuration.

use log::debug;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::validation::{normalize_file_path, normalize_path};

/// Visibility of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!(
                "unknown visibility '{}' (expected public or private)",
                other
            )),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Filesystem-like operations over some backing medium.
///
/// Paths are relative to the storage root; implementations normalize them
/// and must reject paths that escape the root.
pub trait Storage: Send + Sync {
    /// Reads the full contents of a file.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes a file, replacing any previous contents.
    fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    /// Lists the direct children of a directory. Sub-directories carry a
    /// trailing `/`. Entries are sorted.
    fn list(&self, directory: &str) -> Result<Vec<String>, StorageError>;

    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    fn delete(&self, path: &str) -> Result<(), StorageError>;

    fn visibility(&self, path: &str) -> Result<Visibility, StorageError>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), StorageError>;

    /// Whether two paths name the same file in this storage.
    fn same_file(&self, first: &str, second: &str) -> Result<bool, StorageError> {
        Ok(normalize_file_path(first)? == normalize_file_path(second)?)
    }
}

/// Options applied by [`Filesystem`] on top of its adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemOptions {
    /// Visibility applied to every newly written file
    pub visibility: Option<Visibility>,
    /// When false, paths are lower-cased before reaching the adapter
    pub case_sensitive: bool,
    /// When false, reads and deletes assert the file exists and writes
    /// assert it does not
    pub disable_asserts: bool,
}

impl Default for FilesystemOptions {
    fn default() -> Self {
        Self {
            visibility: None,
            case_sensitive: true,
            disable_asserts: false,
        }
    }
}

/// A storage bound to an adapter plus its configured options
pub struct Filesystem {
    adapter: Arc<dyn Storage>,
    options: FilesystemOptions,
}

impl Filesystem {
    pub fn new(adapter: Arc<dyn Storage>, options: FilesystemOptions) -> Self {
        Self { adapter, options }
    }

    pub fn options(&self) -> &FilesystemOptions {
        &self.options
    }

    fn map_path(&self, path: &str) -> Result<String, StorageError> {
        let normalized = normalize_path(path)?;
        if self.options.case_sensitive {
            Ok(normalized)
        } else {
            Ok(normalized.to_lowercase())
        }
    }

    fn map_file_path(&self, path: &str) -> Result<String, StorageError> {
        normalize_file_path(path)?;
        self.map_path(path)
    }

    fn assert_present(&self, path: &str) -> Result<(), StorageError> {
        if !self.options.disable_asserts && !self.adapter.exists(path)? {
            return Err(StorageError::FileNotFound(path.to_string()));
        }
        Ok(())
    }

    fn assert_absent(&self, path: &str) -> Result<(), StorageError> {
        if !self.options.disable_asserts && self.adapter.exists(path)? {
            return Err(StorageError::FileAlreadyExists(path.to_string()));
        }
        Ok(())
    }
}

impl Storage for Filesystem {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.map_file_path(path)?;
        self.assert_present(&path)?;
        self.adapter.read(&path)
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let path = self.map_file_path(path)?;
        self.assert_absent(&path)?;
        self.adapter.write(&path, contents)?;

        if let Some(visibility) = self.options.visibility {
            debug!("Applying default visibility {} to {}", visibility, path);
            self.adapter.set_visibility(&path, visibility)?;
        }
        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, StorageError> {
        let directory = self.map_path(directory)?;
        self.adapter.list(&directory)
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = self.map_path(path)?;
        self.adapter.exists(&path)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let path = self.map_file_path(path)?;
        self.assert_present(&path)?;
        self.adapter.delete(&path)
    }

    fn visibility(&self, path: &str) -> Result<Visibility, StorageError> {
        let path = self.map_file_path(path)?;
        self.assert_present(&path)?;
        self.adapter.visibility(&path)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), StorageError> {
        let path = self.map_file_path(path)?;
        self.assert_present(&path)?;
        self.adapter.set_visibility(&path, visibility)
    }

    fn same_file(&self, first: &str, second: &str) -> Result<bool, StorageError> {
        Ok(self.map_file_path(first)? == self.map_file_path(second)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryAdapter;

    fn filesystem(options: FilesystemOptions) -> Filesystem {
        Filesystem::new(Arc::new(MemoryAdapter::new()), options)
    }

    #[test]
    fn test_default_options() {
        let options = FilesystemOptions::default();
        assert!(options.case_sensitive);
        assert!(!options.disable_asserts);
        assert_eq!(options.visibility, None);
    }

    #[test]
    fn test_write_then_read() {
        let fs = filesystem(FilesystemOptions::default());
        fs.write("docs/readme.md", b"hello").unwrap();
        assert_eq!(fs.read("/docs/readme.md").unwrap(), b"hello");
        assert_eq!(fs.list("docs").unwrap(), vec!["readme.md".to_string()]);
    }

    #[test]
    fn test_asserts_reject_overwrite_and_missing_files() {
        let fs = filesystem(FilesystemOptions::default());
        fs.write("a.txt", b"1").unwrap();

        assert!(matches!(
            fs.write("a.txt", b"2"),
            Err(StorageError::FileAlreadyExists(_))
        ));
        assert!(matches!(
            fs.read("missing.txt"),
            Err(StorageError::FileNotFound(_))
        ));
        assert!(matches!(
            fs.delete("missing.txt"),
            Err(StorageError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_disabled_asserts_allow_overwrite() {
        let fs = filesystem(FilesystemOptions {
            disable_asserts: true,
            ..FilesystemOptions::default()
        });
        fs.write("a.txt", b"1").unwrap();
        fs.write("a.txt", b"2").unwrap();
        assert_eq!(fs.read("a.txt").unwrap(), b"2");
    }

    #[test]
    fn test_case_insensitive_paths() {
        let fs = filesystem(FilesystemOptions {
            case_sensitive: false,
            ..FilesystemOptions::default()
        });
        fs.write("Reports/Q1.CSV", b"x").unwrap();
        assert!(fs.exists("reports/q1.csv").unwrap());
        assert_eq!(fs.read("REPORTS/q1.csv").unwrap(), b"x");
    }

    #[test]
    fn test_default_visibility_applied_on_write() {
        let fs = filesystem(FilesystemOptions {
            visibility: Some(Visibility::Private),
            ..FilesystemOptions::default()
        });
        fs.write("secret.key", b"k").unwrap();
        assert_eq!(fs.visibility("secret.key").unwrap(), Visibility::Private);

        fs.set_visibility("secret.key", Visibility::Public).unwrap();
        assert_eq!(fs.visibility("secret.key").unwrap(), Visibility::Public);
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(" Private ".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("hidden".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_root_is_not_a_file() {
        let fs = filesystem(FilesystemOptions::default());
        assert!(matches!(
            fs.write("/", b"x"),
            Err(StorageError::InvalidPath(_))
        ));
    }
}
