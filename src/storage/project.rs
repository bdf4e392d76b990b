//! Project management
//!
//! A project is a directory holding `flowgen.toml` and a diagrams
//! directory. Commands work without one (the diagrams directory then
//! resolves against the working directory), but `flowgen init` sets one up.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_FILE;
use super::{Config, DiagramStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not a flowgen project (no {file} in {})", root.display())]
    NotInProject { root: PathBuf, file: &'static str },
}

const DEFAULT_CONFIG: &str = r#"# flowgen configuration

# Directory holding diagram files, relative to this file
diagrams_path = "diagrams"

# Version given to diagrams created by 'flowgen new'
default_version = "1.0.0"
"#;

/// A flowgen project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_FILE).is_file() {
            return Err(ProjectError::NotInProject {
                root,
                file: PROJECT_FILE,
            }
            .into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Initializes a new project at the given path. Existing files are kept.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create project directory: {}", root.display()))?;

        let config_path = root.join(PROJECT_FILE);
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let project = Self::open(root)?;

        let diagrams_dir = project.diagrams_dir();
        fs::create_dir_all(&diagrams_dir).with_context(|| {
            format!(
                "Failed to create diagrams directory: {}",
                diagrams_dir.display()
            )
        })?;

        log::info!("Initialized project at {}", project.root.display());
        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the diagrams directory
    pub fn diagrams_dir(&self) -> PathBuf {
        self.config.diagrams_dir()
    }

    /// Returns the diagram store
    pub fn store(&self) -> DiagramStore {
        DiagramStore::open(&self.config)
    }
}
