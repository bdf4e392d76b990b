//! flowgen - a store for hierarchical flow diagrams
//!
//! Diagrams are YAML documents holding typed nodes and edges. They link into
//! a parent/child hierarchy (nodes can drill down into child diagrams) and
//! are written in a canonical form so version-control diffs only show real
//! edits.

pub mod domain;
pub mod storage;
pub mod service;
pub mod cli;

pub use domain::{validate, Diagram, Edge, Node, NodeType, ValidationResult};
pub use service::Hierarchy;
pub use storage::{DiagramStore, StoreError};
