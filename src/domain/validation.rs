//! Structural and referential validation of a single diagram
//!
//! Validation never fails: an invalid diagram is a normal outcome described
//! by [`ValidationResult`]. Every applicable violation is reported, not just
//! the first. Nothing here looks at other diagrams.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::diagram::Diagram;
use super::id::{is_valid_id, is_valid_version};

/// Machine-readable validation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    MissingId,
    MissingName,
    MissingVersion,
    MissingNodeId,
    MissingNodeName,
    DuplicateNodeId,
    MissingEdgeId,
    MissingEdgeName,
    DuplicateEdgeId,
    InvalidFromNode,
    InvalidToNode,

    // Warnings
    InvalidIdFormat,
    InvalidVersionFormat,
    SelfReferencingEdge,
    DrilldownNotChild,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::MissingId => "MISSING_ID",
            ValidationCode::MissingName => "MISSING_NAME",
            ValidationCode::MissingVersion => "MISSING_VERSION",
            ValidationCode::MissingNodeId => "MISSING_NODE_ID",
            ValidationCode::MissingNodeName => "MISSING_NODE_NAME",
            ValidationCode::DuplicateNodeId => "DUPLICATE_NODE_ID",
            ValidationCode::MissingEdgeId => "MISSING_EDGE_ID",
            ValidationCode::MissingEdgeName => "MISSING_EDGE_NAME",
            ValidationCode::DuplicateEdgeId => "DUPLICATE_EDGE_ID",
            ValidationCode::InvalidFromNode => "INVALID_FROM_NODE",
            ValidationCode::InvalidToNode => "INVALID_TO_NODE",
            ValidationCode::InvalidIdFormat => "INVALID_ID_FORMAT",
            ValidationCode::InvalidVersionFormat => "INVALID_VERSION_FORMAT",
            ValidationCode::SelfReferencingEdge => "SELF_REFERENCING_EDGE",
            ValidationCode::DrilldownNotChild => "DRILLDOWN_NOT_CHILD",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location inside the document, e.g. `edges[2].from`
    pub path: String,
    pub message: String,
    pub code: ValidationCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ValidationError {
    fn new(path: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
            value: None,
        }
    }

    fn with_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.code, self.message)
    }
}

/// Outcome of validating a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Returns true if any error carries `code`
    pub fn has_error(&self, code: ValidationCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Returns true if any warning carries `code`
    pub fn has_warning(&self, code: ValidationCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Returns a one-line summary of the errors
    pub fn summary(&self) -> String {
        let codes: Vec<_> = self.errors.iter().map(|e| e.code.as_str()).collect();
        format!("{} error(s): {}", self.errors.len(), codes.join(", "))
    }
}

/// Validates a diagram against the structural and referential rules
pub fn validate(diagram: &Diagram) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if diagram.id.is_empty() {
        errors.push(ValidationError::new(
            "id",
            ValidationCode::MissingId,
            "Diagram ID is required",
        ));
    } else if !is_valid_id(&diagram.id) {
        warnings.push(
            ValidationError::new(
                "id",
                ValidationCode::InvalidIdFormat,
                format!("Diagram ID has an unexpected format: {}", diagram.id),
            )
            .with_value(diagram.id.as_str()),
        );
    }

    if diagram.name.is_empty() {
        errors.push(ValidationError::new(
            "name",
            ValidationCode::MissingName,
            "Diagram name is required",
        ));
    }

    if diagram.version.is_empty() {
        errors.push(ValidationError::new(
            "version",
            ValidationCode::MissingVersion,
            "Diagram version is required",
        ));
    } else if !is_valid_version(&diagram.version) {
        warnings.push(
            ValidationError::new(
                "version",
                ValidationCode::InvalidVersionFormat,
                format!("Version is not MAJOR.MINOR.PATCH: {}", diagram.version),
            )
            .with_value(diagram.version.as_str()),
        );
    }

    // Nodes: first occurrence of an id wins
    let mut node_ids: HashSet<&str> = HashSet::new();
    for (i, node) in diagram.nodes.iter().enumerate() {
        if node.id.is_empty() {
            errors.push(ValidationError::new(
                format!("nodes[{}].id", i),
                ValidationCode::MissingNodeId,
                "Node ID is required",
            ));
        } else if !node_ids.insert(node.id.as_str()) {
            errors.push(
                ValidationError::new(
                    format!("nodes[{}].id", i),
                    ValidationCode::DuplicateNodeId,
                    format!("Duplicate node ID: {}", node.id),
                )
                .with_value(node.id.as_str()),
            );
        } else if !is_valid_id(&node.id) {
            warnings.push(
                ValidationError::new(
                    format!("nodes[{}].id", i),
                    ValidationCode::InvalidIdFormat,
                    format!("Node ID has an unexpected format: {}", node.id),
                )
                .with_value(node.id.as_str()),
            );
        }

        if node.name.is_empty() {
            errors.push(ValidationError::new(
                format!("nodes[{}].name", i),
                ValidationCode::MissingNodeName,
                "Node name is required",
            ));
        }

        if let Some(target) = &node.drill_down {
            if !diagram.has_child(target) {
                warnings.push(
                    ValidationError::new(
                        format!("nodes[{}].drillDown", i),
                        ValidationCode::DrilldownNotChild,
                        format!("Drill-down target is not a child of this diagram: {}", target),
                    )
                    .with_value(target.as_str()),
                );
            }
        }
    }

    let mut edge_ids: HashSet<&str> = HashSet::new();
    for (i, edge) in diagram.edges.iter().enumerate() {
        if edge.id.is_empty() {
            errors.push(ValidationError::new(
                format!("edges[{}].id", i),
                ValidationCode::MissingEdgeId,
                "Edge ID is required",
            ));
        } else if !edge_ids.insert(edge.id.as_str()) {
            errors.push(
                ValidationError::new(
                    format!("edges[{}].id", i),
                    ValidationCode::DuplicateEdgeId,
                    format!("Duplicate edge ID: {}", edge.id),
                )
                .with_value(edge.id.as_str()),
            );
        } else if !is_valid_id(&edge.id) {
            warnings.push(
                ValidationError::new(
                    format!("edges[{}].id", i),
                    ValidationCode::InvalidIdFormat,
                    format!("Edge ID has an unexpected format: {}", edge.id),
                )
                .with_value(edge.id.as_str()),
            );
        }

        if edge.name.is_empty() {
            errors.push(ValidationError::new(
                format!("edges[{}].name", i),
                ValidationCode::MissingEdgeName,
                "Edge name is required",
            ));
        }

        if !node_ids.contains(edge.from.as_str()) {
            errors.push(
                ValidationError::new(
                    format!("edges[{}].from", i),
                    ValidationCode::InvalidFromNode,
                    format!("Edge references non-existent from node: {}", edge.from),
                )
                .with_value(edge.from.as_str()),
            );
        }

        if !node_ids.contains(edge.to.as_str()) {
            errors.push(
                ValidationError::new(
                    format!("edges[{}].to", i),
                    ValidationCode::InvalidToNode,
                    format!("Edge references non-existent to node: {}", edge.to),
                )
                .with_value(edge.to.as_str()),
            );
        }

        if !edge.from.is_empty() && edge.from == edge.to {
            warnings.push(
                ValidationError::new(
                    format!("edges[{}]", i),
                    ValidationCode::SelfReferencingEdge,
                    format!("Edge connects node {} to itself", edge.from),
                )
                .with_value(edge.from.as_str()),
            );
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
