//! Domain models for flowgen
//!
//! Contains the diagram model and its rules without any I/O concerns.

mod id;
mod diagram;
mod validation;
mod graph;

pub use id::{generate_diagram_id, is_valid_id, is_valid_version, parse_id, parse_version, IdError};
pub use diagram::{
    Diagram, Dimensions, Edge, EdgeType, Integrations, JiraIntegration, Layout, LayoutDirection,
    LayoutSpacing, Metadata, Node, NodeType, Position, Style,
};
pub use validation::{validate, ValidationCode, ValidationError, ValidationResult};
pub use graph::{audit, HierarchyGraph, HierarchyIssue, HierarchyReport};
