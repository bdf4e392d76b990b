//! # Storage Layer
//!
//! Persistence for flowgen with git-friendly, diff-stable files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Diagrams | Canonical YAML | `diagrams/{id}.yaml` (any `.yaml`/`.yml` below is read) |
//! | Project config | TOML | `flowgen.toml` |
//! | Global config | TOML | `~/.config/flowgen/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`FsBackend`] writes are atomic (temp file under an `fs2` lock, then rename)
//! - [`DiagramStore`] serializes its read-modify-write sequences with a mutex
//! - Writes spanning several diagrams are staged and rolled back on failure
//!
//! ## Key Types
//!
//! - [`DiagramStore`] - Read/write diagrams through a [`Backend`]
//! - [`codec`] - Canonical YAML encoding
//! - [`Config`] - Project, global and environment configuration
//! - [`Project`] - Project initialization

pub mod backend;
pub mod codec;
mod config;
mod project;
mod store;

pub use backend::{Backend, BackendError, FsBackend, MemoryBackend};
pub use codec::CodecError;
pub use config::{
    Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, DIAGRAMS_PATH_ENV,
    PROJECT_FILE,
};
pub use project::{Project, ProjectError};
pub use store::{
    DeleteReport, DiagramStore, Scan, SkippedDocument, StoreError, EXTENSIONS,
};
