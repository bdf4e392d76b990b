//! Configuration handling for flowgen
//!
//! Configuration is stored in `flowgen.toml` at the project root and
//! `~/.config/flowgen/config.toml` (global). Later sources win:
//! defaults, global file, project file, `FLOWGEN_DIAGRAMS_PATH`, and finally
//! whatever the caller overrides (the CLI's `--diagrams` flag).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::is_valid_version;

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "flowgen.toml";

/// Environment variable overriding the diagrams directory
pub const DIAGRAMS_PATH_ENV: &str = "FLOWGEN_DIAGRAMS_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory holding diagram files, relative to the project root
    pub diagrams_path: PathBuf,

    /// Version given to diagrams created by `flowgen new`
    pub default_version: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            diagrams_path: PathBuf::from("diagrams"),
            default_version: "1.0.0".to_string(),
        }
    }
}

impl ProjectConfig {
    fn check(&self) -> Result<(), ConfigError> {
        if self.diagrams_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("diagrams_path is empty".to_string()));
        }
        if !is_valid_version(&self.default_version) {
            return Err(ConfigError::Invalid(format!(
                "default_version '{}' is not MAJOR.MINOR.PATCH",
                self.default_version
            )));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,

    /// Directory relative paths resolve against when there is no project
    pub base_dir: PathBuf,
}

impl Config {
    /// Loads configuration for the given working directory
    pub fn load(cwd: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root(cwd);
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        let mut config = Self {
            project,
            global,
            project_root,
            base_dir: cwd.to_path_buf(),
        };
        config.apply_env();
        log::debug!("Diagrams directory: {}", config.diagrams_dir().display());
        Ok(config)
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
            base_dir: project_root.to_path_buf(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DIAGRAMS_PATH_ENV) {
            if !path.is_empty() {
                self.project.diagrams_path = PathBuf::from(path);
            }
        }
    }

    /// Overrides the diagrams directory
    pub fn with_diagrams_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.project.diagrams_path = path.into();
        self
    }

    /// Returns the resolved diagrams directory
    pub fn diagrams_dir(&self) -> PathBuf {
        let path = &self.project.diagrams_path;
        if path.is_absolute() {
            return path.clone();
        }
        self.project_root
            .as_deref()
            .unwrap_or(&self.base_dir)
            .join(path)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "flowgen", "flowgen").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .check()
            .with_context(|| format!("In {}", config_path.display()))?;
        Ok(config)
    }

    /// Finds the project root by looking for `flowgen.toml` in `start` or
    /// any parent
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if a project file was found
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Saves the project configuration
    pub fn save_project(&self) -> Result<()> {
        let root = self
            .project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a flowgen project. Run 'flowgen init' first."))?;
        let config_path = root.join(PROJECT_FILE);

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }
}
