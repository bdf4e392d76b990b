//! Parent/child links between diagrams
//!
//! Links are stored on both ends: the parent lists the child in `children`
//! (optionally with a node drilling down into it) and the child names the
//! parent in `parent`. Linking does not reject cycles; tree traversal does.
//!
//! Traversals are best-effort: a child id that does not resolve is skipped,
//! logged, and reported as a [`TraversalIssue`] alongside the result.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{audit, Diagram, HierarchyGraph, HierarchyReport};
use crate::storage::{Backend, DiagramStore, FsBackend, StoreError};

type Result<T> = std::result::Result<T, StoreError>;

/// A child reference that could not be followed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraversalIssue {
    MissingChild { parent: String, child: String },
}

impl TraversalIssue {
    fn missing_child(parent: &str, child: &str) -> Self {
        log::warn!("Skipping child {} of {}: diagram not found", child, parent);
        TraversalIssue::MissingChild {
            parent: parent.to_string(),
            child: child.to_string(),
        }
    }
}

impl std::fmt::Display for TraversalIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalIssue::MissingChild { parent, child } => {
                write!(f, "{} lists missing child {}", parent, child)
            }
        }
    }
}

/// Resolved children of a diagram
#[derive(Debug, Serialize)]
pub struct Children {
    pub diagrams: Vec<Diagram>,
    pub issues: Vec<TraversalIssue>,
}

/// A diagram and its resolved subtree
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyNode {
    pub diagram: Diagram,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Number of diagrams in this subtree, counting repeats under separate
    /// branches
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }

    /// Visits every node depth-first with its depth
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a HierarchyNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a HierarchyNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}

/// A hierarchy tree and the references skipped while building it
#[derive(Debug, Serialize)]
pub struct HierarchyTree {
    pub root: HierarchyNode,
    pub issues: Vec<TraversalIssue>,
}

/// Hierarchy operations on top of a store
pub struct Hierarchy<'a, B = FsBackend> {
    store: &'a DiagramStore<B>,
}

/// Diagrams of one scan, first occurrence of an id wins
struct Index {
    diagrams: Vec<Diagram>,
    by_id: HashMap<String, usize>,
}

impl Index {
    fn new(diagrams: Vec<Diagram>) -> Self {
        let mut by_id = HashMap::new();
        for (i, diagram) in diagrams.iter().enumerate() {
            by_id.entry(diagram.id.clone()).or_insert(i);
        }
        Self { diagrams, by_id }
    }

    fn get(&self, id: &str) -> Option<&Diagram> {
        self.by_id.get(id).map(|&i| &self.diagrams[i])
    }

    fn require(&self, id: &str) -> Result<&Diagram> {
        self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl<'a, B: Backend> Hierarchy<'a, B> {
    pub fn new(store: &'a DiagramStore<B>) -> Self {
        Self { store }
    }

    fn index(&self) -> Result<Index> {
        Ok(Index::new(self.store.list_all()?))
    }

    /// Resolves the diagrams listed in a parent's `children`
    pub fn get_children(&self, parent_id: &str) -> Result<Children> {
        let index = self.index()?;
        let parent = index.require(parent_id)?;

        let mut diagrams = Vec::new();
        let mut issues = Vec::new();
        for child_id in &parent.children {
            match index.get(child_id) {
                Some(child) => diagrams.push(child.clone()),
                None => issues.push(TraversalIssue::missing_child(parent_id, child_id)),
            }
        }

        Ok(Children { diagrams, issues })
    }

    /// Resolves the diagram named by a child's `parent`
    pub fn get_parent(&self, child_id: &str) -> Result<Diagram> {
        let child = self.store.get(child_id)?;
        let parent_id = child
            .parent
            .ok_or_else(|| StoreError::NoParent(child_id.to_string()))?;
        self.store.get(&parent_id)
    }

    /// Links `child_id` under `parent_id`, optionally making `node_id` in
    /// the parent drill down into the child. Both diagrams are loaded,
    /// changed and written as one unit under the store's write lock.
    pub fn link(
        &self,
        parent_id: &str,
        child_id: &str,
        node_id: Option<&str>,
    ) -> Result<(Diagram, Diagram)> {
        if parent_id == child_id {
            let updated = self.store.modify(parent_id, |diagram, all| {
                Self::check_link(all, diagram, child_id, diagram.parent.as_deref(), node_id)?;
                Self::attach(diagram, child_id, node_id);
                diagram.parent = Some(parent_id.to_string());
                Ok(())
            })?;
            return Ok((updated.clone(), updated));
        }

        let linked = self.store.modify_pair(parent_id, child_id, |parent, child, all| {
            Self::check_link(all, parent, child_id, child.parent.as_deref(), node_id)?;
            Self::attach(parent, child_id, node_id);
            child.parent = Some(parent_id.to_string());
            Ok(())
        })?;

        log::info!("Linked {} under {}", child_id, parent_id);
        Ok(linked)
    }

    /// Rejects a missing drill-down node and warns about re-parenting and
    /// cycles
    fn check_link(
        all: &[Diagram],
        parent: &Diagram,
        child_id: &str,
        previous_parent: Option<&str>,
        node_id: Option<&str>,
    ) -> Result<()> {
        if let Some(node_id) = node_id {
            if parent.node(node_id).is_none() {
                return Err(StoreError::NodeNotFound {
                    diagram: parent.id.clone(),
                    node: node_id.to_string(),
                });
            }
        }

        if let Some(previous) = previous_parent.filter(|p| *p != parent.id) {
            log::warn!(
                "{} was a child of {}; {} will still list it",
                child_id,
                previous,
                previous
            );
        }

        let graph = HierarchyGraph::from_diagrams(all);
        if graph.would_create_cycle(&parent.id, child_id) {
            log::warn!(
                "Linking {} under {} creates a cycle; tree traversal will fail",
                child_id,
                parent.id
            );
        }

        Ok(())
    }

    fn attach(parent: &mut Diagram, child_id: &str, node_id: Option<&str>) {
        parent.add_child(child_id);
        if let Some(node) = node_id.and_then(|id| parent.node_mut(id)) {
            node.drill_down = Some(child_id.to_string());
        }
    }

    /// Removes the link between `parent_id` and `child_id`, including any
    /// drill-down from the parent into the child
    pub fn unlink(&self, parent_id: &str, child_id: &str) -> Result<(Diagram, Diagram)> {
        if parent_id == child_id {
            let updated = self.store.modify(parent_id, |diagram, _| {
                diagram.detach_child(child_id);
                diagram.parent = None;
                Ok(())
            })?;
            return Ok((updated.clone(), updated));
        }

        let unlinked = self.store.modify_pair(parent_id, child_id, |parent, child, _| {
            parent.detach_child(child_id);
            child.parent = None;
            Ok(())
        })?;

        log::info!("Unlinked {} from {}", child_id, parent_id);
        Ok(unlinked)
    }

    /// Builds the tree below `root_id`. A diagram may appear under several
    /// branches; a diagram reached again from its own subtree fails the
    /// build with [`StoreError::CircularReference`].
    pub fn tree(&self, root_id: &str) -> Result<HierarchyTree> {
        let index = self.index()?;
        let root = index.require(root_id)?;

        let mut path = Vec::new();
        let mut issues = Vec::new();
        let root = Self::build(&index, root, &mut path, &mut issues)?;

        log::debug!(
            "Built tree for {} with {} diagram(s), {} issue(s)",
            root_id,
            root.size(),
            issues.len()
        );
        Ok(HierarchyTree { root, issues })
    }

    fn build(
        index: &Index,
        diagram: &Diagram,
        path: &mut Vec<String>,
        issues: &mut Vec<TraversalIssue>,
    ) -> Result<HierarchyNode> {
        if let Some(start) = path.iter().position(|id| *id == diagram.id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(diagram.id.clone());
            return Err(StoreError::CircularReference { path: cycle });
        }

        path.push(diagram.id.clone());

        let mut children = Vec::new();
        for child_id in &diagram.children {
            match index.get(child_id) {
                Some(child) => children.push(Self::build(index, child, path, issues)?),
                None => issues.push(TraversalIssue::missing_child(&diagram.id, child_id)),
            }
        }

        path.pop();

        Ok(HierarchyNode {
            diagram: diagram.clone(),
            children,
        })
    }

    /// Checks the whole store for hierarchy problems
    pub fn audit(&self) -> Result<HierarchyReport> {
        let diagrams = self.store.list_all()?;
        Ok(audit(&diagrams))
    }
}
