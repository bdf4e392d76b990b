//! Identifier and version formats
//!
//! Format:
//! - Ids (diagrams, nodes, edges): `^[a-zA-Z][a-zA-Z0-9_-]*$` (e.g., `checkout-flow`)
//! - Generated diagram ids: `d-{7-char-hash}` (e.g., `d-7f2b4c1`)
//! - Versions: `MAJOR.MINOR.PATCH` (e.g., `1.0.0`)
//!
//! Hash is derived from name + creation timestamp, so the same name at
//! different times produces different ids.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("id pattern is valid"));

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is valid"));

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid id '{0}': must start with a letter and contain only letters, digits, '_' or '-'")]
    InvalidId(String),

    #[error("Invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),
}

/// Returns true if `id` matches the id format
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

/// Returns true if `version` matches the version format
pub fn is_valid_version(version: &str) -> bool {
    VERSION_PATTERN.is_match(version)
}

/// Checks an id supplied by a user
pub fn parse_id(id: &str) -> Result<String, IdError> {
    let id = id.trim();
    if is_valid_id(id) {
        Ok(id.to_string())
    } else {
        Err(IdError::InvalidId(id.to_string()))
    }
}

/// Checks a version supplied by a user
pub fn parse_version(version: &str) -> Result<String, IdError> {
    let version = version.trim();
    if is_valid_version(version) {
        Ok(version.to_string())
    } else {
        Err(IdError::InvalidVersion(version.to_string()))
    }
}

/// Generates a diagram id in the format `d-{7-char-hash}`
pub fn generate_diagram_id(name: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    format!("d-{}", &hash.to_hex()[..7])
}
