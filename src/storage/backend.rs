//! Persistence primitives
//!
//! The store only ever talks to storage through [`Backend`]: a flat
//! namespace of `/`-separated keys holding byte blobs. [`FsBackend`] maps
//! keys onto files under a root directory; [`MemoryBackend`] keeps them in
//! memory.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Byte-blob storage addressed by key
pub trait Backend {
    /// Lists every key under `namespace` (`""` for all keys)
    fn list(&self, namespace: &str) -> Result<Vec<String>, BackendError>;

    /// Reads the blob stored at `key`
    fn read(&self, key: &str) -> Result<Vec<u8>, BackendError>;

    /// Replaces the blob stored at `key`
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError>;

    /// Removes the blob stored at `key`
    fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Returns true if `key` holds a blob
    fn exists(&self, key: &str) -> bool;
}

/// Rejects keys that would escape the namespace
fn check_key(key: &str) -> Result<(), BackendError> {
    let path = Path::new(key);
    let escapes = key.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(BackendError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Backend storing each key as a file below a root directory
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Creates a backend rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }

    fn io_error(path: &Path, source: io::Error) -> BackendError {
        BackendError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn write_locked(file: &mut File, bytes: &[u8]) -> io::Result<()> {
        file.lock_exclusive()?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn discard_temp(temp_path: &Path) {
        if let Err(e) = fs::remove_file(temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", temp_path.display(), e);
            }
        }
    }

    fn walk(&self, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<(), BackendError> {
        let entries = fs::read_dir(dir).map_err(|e| Self::io_error(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Self::io_error(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            // Lock files, temp files and VCS directories
            if name.starts_with('.') {
                continue;
            }

            let key = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };

            let file_type = entry.file_type().map_err(|e| Self::io_error(&entry.path(), e))?;
            if file_type.is_dir() {
                self.walk(&entry.path(), &key, keys)?;
            } else if file_type.is_file() {
                keys.push(key);
            }
        }

        Ok(())
    }
}

impl Backend for FsBackend {
    fn list(&self, namespace: &str) -> Result<Vec<String>, BackendError> {
        let namespace = namespace.trim_matches('/');
        let dir = if namespace.is_empty() {
            self.root.clone()
        } else {
            check_key(namespace)?;
            self.path_for(namespace)
        };

        let mut keys = Vec::new();
        if dir.is_dir() {
            self.walk(&dir, namespace, &mut keys)?;
        }
        keys.sort();
        Ok(keys)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, BackendError> {
        check_key(key)?;
        let path = self.path_for(key);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
            _ => Self::io_error(&path, e),
        })
    }

    /// Writes atomically: temp file under an exclusive lock, then rename
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        check_key(key)?;
        let path = self.path_for(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BackendError::InvalidKey(key.to_string()))?;
        let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Self::io_error(&temp_path, e))?;

        let written =
            Self::write_locked(&mut file, bytes).map_err(|e| Self::io_error(&temp_path, e));
        drop(file);

        let result = written
            .and_then(|()| fs::rename(&temp_path, &path).map_err(|e| Self::io_error(&path, e)));
        if result.is_err() {
            Self::discard_temp(&temp_path);
        }
        result
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        check_key(key)?;
        let path = self.path_for(key);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
            _ => Self::io_error(&path, e),
        })
    }

    fn exists(&self, key: &str) -> bool {
        check_key(key).is_ok() && self.path_for(key).is_file()
    }
}

/// Backend keeping blobs in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn list(&self, namespace: &str) -> Result<Vec<String>, BackendError> {
        let namespace = namespace.trim_matches('/');
        let prefix = format!("{}/", namespace);
        Ok(self
            .blobs()
            .keys()
            .filter(|k| namespace.is_empty() || k.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, BackendError> {
        check_key(key)?;
        self.blobs()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        check_key(key)?;
        self.blobs().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        check_key(key)?;
        self.blobs()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> bool {
        self.blobs().contains_key(key)
    }
}
