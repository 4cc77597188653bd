//! Local disk adapter
//!
//! Maps storage paths below a root directory. Writes go through a uniquely
//! named temporary file in the target directory, persisted into place once
//! fully written.

use log::{debug, error, info};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::storage::filesystem::{Storage, Visibility};
use crate::storage::validation::{normalize_file_path, normalize_path};

const RETRIES: u32 = 3;

#[cfg(unix)]
const PUBLIC_FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;

/// Adapter rooted at a directory on the local filesystem
#[derive(Debug)]
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    /// Opens an adapter rooted at `root`, creating the directory when
    /// `create_root` is set.
    pub fn new(root: impl Into<PathBuf>, create_root: bool) -> Result<Self, StorageError> {
        let root = root.into();

        if create_root {
            fs::create_dir_all(&root)?;
        } else if !root.is_dir() {
            return Err(StorageError::FileNotFound(root.display().to_string()));
        }

        info!("Local adapter rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn real_path(&self, normalized: &str) -> PathBuf {
        if normalized.is_empty() {
            self.root.clone()
        } else {
            self.root.join(normalized)
        }
    }
}

/// Gives the temporary file the mode of the file it replaces, or the public
/// mode for a new file.
#[cfg(unix)]
fn inherit_mode(temp: &fs::File, file_path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match fs::metadata(file_path) {
        Ok(metadata) => metadata.permissions().mode() & 0o777,
        Err(_) => PUBLIC_FILE_MODE,
    };
    temp.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn inherit_mode(_temp: &fs::File, _file_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn not_found_as(path: &str, error: std::io::Error) -> StorageError {
    if error.kind() == ErrorKind::NotFound {
        StorageError::FileNotFound(path.to_string())
    } else {
        StorageError::from(error)
    }
}

impl Storage for LocalAdapter {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalize_file_path(path)?;
        fs::read(self.real_path(&path)).map_err(|e| not_found_as(&path, e))
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        let file_path = self.real_path(&path);

        let parent = file_path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(contents)?;
        inherit_mode(temp.as_file(), &file_path)?;

        // A failed persist drops the temporary file with the error
        temp.persist(&file_path).map_err(|e| {
            error!("Failed to move data into place at {}: {}", file_path.display(), e.error);
            StorageError::from(e.error)
        })?;

        debug!("Wrote {} bytes to {}", contents.len(), file_path.display());
        Ok(())
    }

    fn list(&self, directory: &str) -> Result<Vec<String>, StorageError> {
        let directory = normalize_path(directory)?;
        let real_path = self.real_path(&directory);

        let entries = match fs::read_dir(&real_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from(e)),
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => names.push(format!("{}/", name)),
                _ => names.push(name),
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let path = normalize_path(path)?;
        Ok(self.real_path(&path).exists())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        let file_path = self.real_path(&path);

        // Delete with retries for permission issues
        for attempt in 1..=RETRIES {
            match fs::remove_file(&file_path) {
                Ok(_) => {
                    debug!("Deleted {}", file_path.display());
                    return Ok(());
                }
                Err(e) if attempt < RETRIES && e.kind() == ErrorKind::PermissionDenied => {
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", file_path.display(), e);
                    return Err(not_found_as(&path, e));
                }
            }
        }

        Err(StorageError::IoError(std::io::Error::other(
            "Failed to delete file after retries",
        )))
    }

    #[cfg(unix)]
    fn visibility(&self, path: &str) -> Result<Visibility, StorageError> {
        use std::os::unix::fs::PermissionsExt;

        let path = normalize_file_path(path)?;
        let metadata = fs::metadata(self.real_path(&path)).map_err(|e| not_found_as(&path, e))?;
        if metadata.permissions().mode() & 0o044 == 0 {
            Ok(Visibility::Private)
        } else {
            Ok(Visibility::Public)
        }
    }

    #[cfg(unix)]
    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), StorageError> {
        use std::os::unix::fs::PermissionsExt;

        let path = normalize_file_path(path)?;
        let mode = match visibility {
            Visibility::Public => PUBLIC_FILE_MODE,
            Visibility::Private => PRIVATE_FILE_MODE,
        };
        fs::set_permissions(self.real_path(&path), fs::Permissions::from_mode(mode))
            .map_err(|e| not_found_as(&path, e))
    }

    #[cfg(not(unix))]
    fn visibility(&self, path: &str) -> Result<Visibility, StorageError> {
        let path = normalize_file_path(path)?;
        fs::metadata(self.real_path(&path)).map_err(|e| not_found_as(&path, e))?;
        Ok(Visibility::Public)
    }

    #[cfg(not(unix))]
    fn set_visibility(&self, path: &str, _visibility: Visibility) -> Result<(), StorageError> {
        let path = normalize_file_path(path)?;
        fs::metadata(self.real_path(&path)).map_err(|e| not_found_as(&path, e))?;
        Ok(())
    }
}
