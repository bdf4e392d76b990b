//! Services built on top of the diagram store
//!
//! - [`Hierarchy`] - parent/child links, tree traversal, integrity audit
//! - [`search_diagrams`] / [`search_nodes`] - scored text search

mod hierarchy;
mod search;

pub use hierarchy::{Children, Hierarchy, HierarchyNode, HierarchyTree, TraversalIssue};
pub use search::{search_diagrams, search_nodes, MatchType, NodeSearchResult, SearchResult};
