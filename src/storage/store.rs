//! Diagram store
//!
//! Diagrams are stored as YAML files (`{id}.yaml`) through a [`Backend`].
//! There is no index: every lookup rescans the namespace, so hand edits and
//! `git checkout` are picked up immediately. Files that fail to parse are
//! skipped and logged rather than failing the whole listing.
//!
//! Every write goes through the validator first; invalid diagrams are
//! never persisted. Writes touching several diagrams are staged and then
//! committed together, restoring the previous bytes if a later write fails.
//! Each mutation holds the store's write lock from its scan to its commit.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::backend::{Backend, BackendError, FsBackend};
use super::codec::{self, CodecError};
use super::config::Config;
use crate::domain::{validate, Diagram, ValidationResult};

/// File extensions recognised as diagrams
pub const EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Diagram not found: {0}")]
    NotFound(String),

    #[error("Diagram already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid diagram: {}", .0.summary())]
    InvalidDocument(ValidationResult),

    #[error("Diagram id mismatch: document declares '{found}', target is '{expected}'")]
    IdMismatch { expected: String, found: String },

    #[error("Node {node} not found in diagram {diagram}")]
    NodeNotFound { diagram: String, node: String },

    #[error("Diagram has no parent: {0}")]
    NoParent(String),

    #[error("Expected two different diagrams, got {0} twice")]
    SameDiagram(String),

    #[error("Circular reference in hierarchy: {}", .path.join(" -> "))]
    CircularReference { path: Vec<String> },

    #[error("Failed to parse {key}: {source}")]
    Parse {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to encode diagram {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Persistence(#[from] BackendError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// A stored file that could not be loaded
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub key: String,
    pub reason: String,
}

/// Everything found by one pass over the namespace
#[derive(Debug, Default)]
pub struct Scan {
    pub diagrams: Vec<Diagram>,
    pub skipped: Vec<SkippedDocument>,
}

impl Scan {
    fn take(self, id: &str) -> Option<Diagram> {
        self.diagrams.into_iter().find(|d| d.id == id)
    }

    fn find(&self, id: &str) -> Result<&Diagram> {
        self.diagrams
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Outcome of deleting a diagram
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub id: String,
    pub key: String,

    /// Diagrams whose references to the deleted diagram were removed
    pub detached: Vec<String>,
}

/// A pending change to one key
enum Change {
    Write { key: String, bytes: Vec<u8> },
    Remove { key: String },
}

impl Change {
    fn key(&self) -> &str {
        match self {
            Change::Write { key, .. } | Change::Remove { key } => key,
        }
    }
}

/// Store for diagrams as YAML files
pub struct DiagramStore<B = FsBackend> {
    backend: B,

    /// Serializes read-modify-write sequences within this process
    write_lock: Mutex<()>,
}

impl DiagramStore<FsBackend> {
    /// Opens the store at the configured diagrams directory
    pub fn open(config: &Config) -> Self {
        Self::new(FsBackend::new(config.diagrams_dir()))
    }
}

impl<B: Backend> DiagramStore<B> {
    /// Creates a store over the given backend
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the storage key derived from a diagram id
    pub fn key_for(id: &str) -> String {
        format!("{}.yaml", id)
    }

    fn is_diagram_key(key: &str) -> bool {
        key.rsplit_once('.')
            .is_some_and(|(_, ext)| EXTENSIONS.contains(&ext))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads the text stored at a key
    fn read_text(&self, key: &str) -> Result<String> {
        let bytes = self.backend.read(key)?;
        String::from_utf8(bytes).map_err(|e| StoreError::Parse {
            key: key.to_string(),
            source: CodecError::Utf8(e),
        })
    }

    /// Loads and parses the diagram stored at a key
    fn load(&self, key: &str) -> Result<Diagram> {
        let text = self.read_text(key)?;
        let mut diagram = codec::parse(&text).map_err(|source| StoreError::Parse {
            key: key.to_string(),
            source,
        })?;
        diagram.location = Some(key.to_string());
        Ok(diagram)
    }

    fn encode(diagram: &Diagram) -> Result<Vec<u8>> {
        codec::serialize(diagram)
            .map(String::into_bytes)
            .map_err(|source| StoreError::Encode {
                id: diagram.id.clone(),
                source,
            })
    }

    fn ensure_valid(diagram: &Diagram) -> Result<()> {
        let result = validate(diagram);
        if result.valid {
            Ok(())
        } else {
            Err(StoreError::InvalidDocument(result))
        }
    }

    /// Loads every diagram, recording files that fail to load
    pub fn scan(&self) -> Result<Scan> {
        let mut scan = Scan::default();

        for key in self.backend.list("")? {
            if !Self::is_diagram_key(&key) {
                continue;
            }

            match self.load(&key) {
                Ok(diagram) => scan.diagrams.push(diagram),
                Err(e) => {
                    log::warn!("Skipping {}: {}", key, e);
                    scan.skipped.push(SkippedDocument {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!(
            "Scanned {} diagram(s), skipped {}",
            scan.diagrams.len(),
            scan.skipped.len()
        );
        Ok(scan)
    }

    /// Lists all diagrams in enumeration order
    pub fn list_all(&self) -> Result<Vec<Diagram>> {
        Ok(self.scan()?.diagrams)
    }

    /// Reads a single diagram by id (linear scan)
    pub fn get(&self, id: &str) -> Result<Diagram> {
        self.scan()?
            .take(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Returns true if a diagram with this id is stored
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.scan()?.diagrams.iter().any(|d| d.id == id))
    }

    /// Validates a diagram without touching storage
    pub fn validate(&self, diagram: &Diagram) -> ValidationResult {
        validate(diagram)
    }

    /// Creates a new diagram at `{id}.yaml`
    pub fn create(&self, diagram: Diagram) -> Result<Diagram> {
        let _guard = self.lock();
        self.create_locked(diagram)
    }

    fn create_locked(&self, mut diagram: Diagram) -> Result<Diagram> {
        let now = Utc::now();
        diagram.created = now;
        diagram.updated = now;
        Self::ensure_valid(&diagram)?;

        let key = Self::key_for(&diagram.id);
        if self.backend.exists(&key) || self.scan()?.diagrams.iter().any(|d| d.id == diagram.id) {
            return Err(StoreError::AlreadyExists(diagram.id));
        }

        let bytes = Self::encode(&diagram)?;
        self.commit(vec![Change::Write {
            key: key.clone(),
            bytes,
        }])?;

        log::info!("Created diagram {} at {}", diagram.id, key);
        diagram.location = Some(key);
        Ok(diagram)
    }

    /// Prepares an update against the stored version of the diagram
    fn stage_update(existing: &Diagram, mut diagram: Diagram) -> Result<(Diagram, Change)> {
        diagram.created = existing.created;
        diagram.updated = Utc::now();
        diagram.location = existing.location.clone();
        Self::ensure_valid(&diagram)?;

        let key = diagram
            .location
            .clone()
            .unwrap_or_else(|| Self::key_for(&diagram.id));
        let bytes = Self::encode(&diagram)?;
        diagram.location = Some(key.clone());

        Ok((diagram, Change::Write { key, bytes }))
    }

    /// Replaces an existing diagram, keeping its creation time and location
    pub fn update(&self, diagram: Diagram) -> Result<Diagram> {
        let _guard = self.lock();
        self.update_locked(diagram)
    }

    fn update_locked(&self, diagram: Diagram) -> Result<Diagram> {
        let existing = self
            .scan()?
            .take(&diagram.id)
            .ok_or_else(|| StoreError::NotFound(diagram.id.clone()))?;

        let (diagram, change) = Self::stage_update(&existing, diagram)?;
        self.commit(vec![change])?;

        log::debug!("Updated diagram {}", diagram.id);
        Ok(diagram)
    }

    /// Loads a diagram, lets `edit` change it, and writes it back, all under
    /// the write lock. `edit` also sees every stored diagram as loaded.
    pub fn modify<F>(&self, id: &str, edit: F) -> Result<Diagram>
    where
        F: FnOnce(&mut Diagram, &[Diagram]) -> Result<()>,
    {
        let _guard = self.lock();

        let scan = self.scan()?;
        let existing = scan.find(id)?;
        let mut diagram = existing.clone();
        edit(&mut diagram, &scan.diagrams)?;

        let (diagram, change) = Self::stage_update(existing, diagram)?;
        self.commit(vec![change])?;

        log::debug!("Updated diagram {}", diagram.id);
        Ok(diagram)
    }

    /// Two-document form of [`modify`](Self::modify): both diagrams are
    /// loaded, edited, validated and committed as one unit under the write
    /// lock, so concurrent callers in this process cannot interleave. If the
    /// second write fails the first is rolled back.
    pub fn modify_pair<F>(
        &self,
        first_id: &str,
        second_id: &str,
        edit: F,
    ) -> Result<(Diagram, Diagram)>
    where
        F: FnOnce(&mut Diagram, &mut Diagram, &[Diagram]) -> Result<()>,
    {
        if first_id == second_id {
            return Err(StoreError::SameDiagram(first_id.to_string()));
        }

        let _guard = self.lock();

        let scan = self.scan()?;
        let existing_first = scan.find(first_id)?;
        let existing_second = scan.find(second_id)?;

        let mut first = existing_first.clone();
        let mut second = existing_second.clone();
        edit(&mut first, &mut second, &scan.diagrams)?;

        let (first, first_change) = Self::stage_update(existing_first, first)?;
        let (second, second_change) = Self::stage_update(existing_second, second)?;
        self.commit(vec![first_change, second_change])?;

        log::debug!("Updated diagrams {} and {}", first.id, second.id);
        Ok((first, second))
    }

    /// Replaces two existing diagrams as one unit. Both are validated before
    /// anything is written; if the second write fails the first is rolled
    /// back. Two values with the same id collapse into an update of `second`.
    pub fn update_pair(&self, first: Diagram, second: Diagram) -> Result<(Diagram, Diagram)> {
        if first.id == second.id {
            let updated = self.update(second)?;
            return Ok((updated.clone(), updated));
        }

        let (first_id, second_id) = (first.id.clone(), second.id.clone());
        self.modify_pair(&first_id, &second_id, |a, b, _| {
            *a = first;
            *b = second;
            Ok(())
        })
    }

    /// Deletes a diagram and removes every reference other diagrams hold to
    /// it (`children`, `parent`, node drill-downs)
    pub fn delete(&self, id: &str) -> Result<DeleteReport> {
        let _guard = self.lock();

        let scan = self.scan()?;
        let target = scan
            .diagrams
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let target_key = target
            .location
            .clone()
            .unwrap_or_else(|| Self::key_for(id));

        let now = Utc::now();
        let mut changes = Vec::new();
        let mut detached = Vec::new();

        for other in scan.diagrams.iter().filter(|d| d.id != id) {
            let mut other = other.clone();
            let mut changed = other.detach_child(id);
            if other.parent.as_deref() == Some(id) {
                other.parent = None;
                changed = true;
            }

            if changed {
                // Removing references cannot introduce validation errors
                other.updated = now;
                let key = other
                    .location
                    .clone()
                    .unwrap_or_else(|| Self::key_for(&other.id));
                changes.push(Change::Write {
                    key,
                    bytes: Self::encode(&other)?,
                });
                detached.push(other.id);
            }
        }

        changes.push(Change::Remove {
            key: target_key.clone(),
        });
        self.commit(changes)?;

        log::info!(
            "Deleted diagram {} ({}), detached from {} diagram(s)",
            id,
            target_key,
            detached.len()
        );

        Ok(DeleteReport {
            id: id.to_string(),
            key: target_key,
            detached,
        })
    }

    /// Returns the stored text of a diagram
    pub fn load_raw(&self, id: &str) -> Result<String> {
        for ext in EXTENSIONS {
            let key = format!("{}.{}", id, ext);
            if self.backend.exists(&key) {
                return self.read_text(&key);
            }
        }

        let diagram = self.get(id)?;
        let key = diagram
            .location
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.read_text(&key)
    }

    /// Replaces (or creates) a diagram from YAML text. The stored text is
    /// the canonical re-encoding, not the input.
    pub fn save_raw(&self, id: &str, text: &str) -> Result<Diagram> {
        let mut diagram = codec::parse(text).map_err(|source| StoreError::Parse {
            key: Self::key_for(id),
            source,
        })?;

        if diagram.id.is_empty() {
            diagram.id = id.to_string();
        } else if diagram.id != id {
            return Err(StoreError::IdMismatch {
                expected: id.to_string(),
                found: diagram.id,
            });
        }

        let _guard = self.lock();
        if self.exists(id)? {
            self.update_locked(diagram)
        } else {
            self.create_locked(diagram)
        }
    }

    /// Applies changes in order; on failure, restores what was applied
    fn commit(&self, changes: Vec<Change>) -> Result<()> {
        let mut applied: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(changes.len());

        for change in changes {
            let key = change.key().to_string();

            let previous = match self.backend.read(&key) {
                Ok(bytes) => Some(bytes),
                Err(BackendError::NotFound(_)) => None,
                Err(e) => {
                    self.rollback(applied);
                    return Err(e.into());
                }
            };

            let result = match &change {
                Change::Write { key, bytes } => self.backend.write(key, bytes),
                Change::Remove { key } => self.backend.delete(key),
            };

            if let Err(e) = result {
                log::warn!("Write to {} failed, rolling back {} change(s)", key, applied.len());
                self.rollback(applied);
                return Err(e.into());
            }

            applied.push((key, previous));
        }

        Ok(())
    }

    fn rollback(&self, applied: Vec<(String, Option<Vec<u8>>)>) {
        for (key, previous) in applied.into_iter().rev() {
            let restored = match previous {
                Some(bytes) => self.backend.write(&key, &bytes),
                None => self.backend.delete(&key),
            };
            if let Err(e) = restored {
                log::error!("Failed to roll back {}: {}", key, e);
            }
        }
    }
}
