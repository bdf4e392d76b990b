//! Hierarchy graph for diagrams
//!
//! Builds a directed graph of `children` links across a set of diagrams and
//! audits it: cycles, dangling references and parent/children pairs that
//! disagree. Uses petgraph for graph operations.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::diagram::Diagram;

/// A single integrity problem in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyIssue {
    /// Diagrams that reach themselves through `children`
    Cycle { members: Vec<String> },

    /// A `children` entry names a diagram that does not exist
    MissingChild { parent: String, child: String },

    /// A `parent` field names a diagram that does not exist
    MissingParent { child: String, parent: String },

    /// `parent` lists `child`, but the child's `parent` field says otherwise
    ParentMismatch {
        parent: String,
        child: String,
        actual: Option<String>,
    },

    /// The child's `parent` names a diagram that does not list it
    NotListedByParent { child: String, parent: String },

    /// A node drills down into a diagram that is not a child
    DrillDownNotChild {
        diagram: String,
        node: String,
        target: String,
    },
}

impl std::fmt::Display for HierarchyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyIssue::Cycle { members } => {
                write!(f, "cycle: {}", members.join(" -> "))
            }
            HierarchyIssue::MissingChild { parent, child } => {
                write!(f, "{} lists missing child {}", parent, child)
            }
            HierarchyIssue::MissingParent { child, parent } => {
                write!(f, "{} points at missing parent {}", child, parent)
            }
            HierarchyIssue::ParentMismatch {
                parent,
                child,
                actual,
            } => match actual {
                Some(actual) => write!(
                    f,
                    "{} lists child {}, but its parent is {}",
                    parent, child, actual
                ),
                None => write!(f, "{} lists child {}, but it has no parent", parent, child),
            },
            HierarchyIssue::NotListedByParent { child, parent } => {
                write!(f, "{} names parent {}, which does not list it", child, parent)
            }
            HierarchyIssue::DrillDownNotChild {
                diagram,
                node,
                target,
            } => write!(
                f,
                "{}:{} drills down into {}, which is not a child",
                diagram, node, target
            ),
        }
    }
}

/// Result of auditing a set of diagrams
#[derive(Debug, Clone, Default, Serialize)]
pub struct HierarchyReport {
    pub diagrams: usize,
    pub links: usize,
    pub issues: Vec<HierarchyIssue>,
}

impl HierarchyReport {
    /// Returns true if no issues were found
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns the cycles found
    pub fn cycles(&self) -> impl Iterator<Item = &[String]> {
        self.issues.iter().filter_map(|issue| match issue {
            HierarchyIssue::Cycle { members } => Some(members.as_slice()),
            _ => None,
        })
    }
}

/// Directed graph of parent -> child links
#[derive(Debug, Default)]
pub struct HierarchyGraph {
    /// The underlying directed graph
    graph: DiGraph<String, ()>,

    /// Map from diagram id to node index
    node_map: HashMap<String, NodeIndex>,
}

impl HierarchyGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from the `children` lists of the given diagrams.
    /// Links to unknown ids are left out.
    pub fn from_diagrams<'a>(diagrams: impl IntoIterator<Item = &'a Diagram>) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        let diagrams: Vec<_> = diagrams.into_iter().collect();
        for diagram in &diagrams {
            graph.add_diagram(&diagram.id);
        }

        // Second pass: add all edges
        for diagram in &diagrams {
            for child in &diagram.children {
                graph.add_link(&diagram.id, child);
            }
        }

        graph
    }

    /// Adds a diagram to the graph
    pub fn add_diagram(&mut self, id: &str) {
        if !self.node_map.contains_key(id) {
            let idx = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), idx);
        }
    }

    /// Adds a parent -> child link. Returns false if either id is unknown.
    pub fn add_link(&mut self, parent: &str, child: &str) -> bool {
        match (self.node_map.get(parent), self.node_map.get(child)) {
            (Some(&p), Some(&c)) => {
                if self.graph.find_edge(p, c).is_none() {
                    self.graph.add_edge(p, c, ());
                }
                true
            }
            _ => false,
        }
    }

    /// Returns the number of diagrams in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the number of links
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns every cycle, each as a sorted list of member ids.
    /// Self-links count as one-member cycles.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || (scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]))
            })
            .map(|scc| {
                let mut members: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Returns true if adding `parent -> child` would close a cycle
    pub fn would_create_cycle(&self, parent: &str, child: &str) -> bool {
        if parent == child {
            return true;
        }
        match (self.node_map.get(child), self.node_map.get(parent)) {
            (Some(&from), Some(&to)) => petgraph::algo::has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }
}

/// Audits the hierarchy fields of a set of diagrams
pub fn audit<'a>(diagrams: impl IntoIterator<Item = &'a Diagram>) -> HierarchyReport {
    let diagrams: Vec<&Diagram> = diagrams.into_iter().collect();
    let mut by_id: HashMap<&str, &Diagram> = HashMap::new();
    for diagram in &diagrams {
        by_id.entry(diagram.id.as_str()).or_insert(*diagram);
    }
    let graph = HierarchyGraph::from_diagrams(diagrams.iter().copied());

    let mut issues: Vec<HierarchyIssue> = graph
        .cycles()
        .into_iter()
        .map(|members| HierarchyIssue::Cycle { members })
        .collect();

    for diagram in &diagrams {
        for child_id in &diagram.children {
            match by_id.get(child_id.as_str()) {
                None => issues.push(HierarchyIssue::MissingChild {
                    parent: diagram.id.clone(),
                    child: child_id.clone(),
                }),
                Some(child) if child.parent.as_deref() != Some(diagram.id.as_str()) => {
                    issues.push(HierarchyIssue::ParentMismatch {
                        parent: diagram.id.clone(),
                        child: child_id.clone(),
                        actual: child.parent.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(parent_id) = &diagram.parent {
            match by_id.get(parent_id.as_str()) {
                None => issues.push(HierarchyIssue::MissingParent {
                    child: diagram.id.clone(),
                    parent: parent_id.clone(),
                }),
                Some(parent) if !parent.has_child(&diagram.id) => {
                    issues.push(HierarchyIssue::NotListedByParent {
                        child: diagram.id.clone(),
                        parent: parent_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        let mut seen = BTreeSet::new();
        for node in &diagram.nodes {
            if let Some(target) = &node.drill_down {
                if !diagram.has_child(target) && seen.insert((&node.id, target)) {
                    issues.push(HierarchyIssue::DrillDownNotChild {
                        diagram: diagram.id.clone(),
                        node: node.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    HierarchyReport {
        diagrams: graph.len(),
        links: graph.link_count(),
        issues,
    }
}
