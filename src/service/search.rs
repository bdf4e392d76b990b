//! Text search over diagrams and nodes
//!
//! Scoring is additive substring matching on lower-cased text. A name match
//! is worth 1.0, a description match 0.8 and every matching tag 0.6. The
//! reported match type is the first category that matched, in that order.
//! Results come back in store order; callers sort.

use serde::Serialize;

use crate::domain::{Diagram, Node, NodeType};
use crate::storage::{Backend, DiagramStore, StoreError};

const NAME_SCORE: f64 = 1.0;
const DESCRIPTION_SCORE: f64 = 0.8;
const TAG_SCORE: f64 = 0.6;

/// Which field produced the first match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Name,
    Description,
    Tag,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Name => "name",
            MatchType::Description => "description",
            MatchType::Tag => "tag",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagram matching a search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub diagram: Diagram,
    pub score: f64,
    pub match_type: Option<MatchType>,
}

/// A node matching a search, with the diagram it belongs to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSearchResult {
    pub node: Node,
    pub diagram_id: String,
    pub diagram: Diagram,
    pub score: f64,
    pub match_type: Option<MatchType>,
}

/// Running score for one candidate
#[derive(Default)]
struct Score {
    total: f64,
    match_type: Option<MatchType>,
}

impl Score {
    fn add(&mut self, matched: bool, kind: MatchType, points: f64) {
        if matched {
            self.total += points;
            self.match_type.get_or_insert(kind);
        }
    }
}

fn contains(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(query)
}

/// Scores a diagram against an already lower-cased query
fn score_diagram(diagram: &Diagram, query: &str) -> Score {
    let mut score = Score::default();
    score.add(contains(&diagram.name, query), MatchType::Name, NAME_SCORE);
    score.add(
        diagram.description.as_deref().is_some_and(|d| contains(d, query)),
        MatchType::Description,
        DESCRIPTION_SCORE,
    );
    for tag in &diagram.tags {
        score.add(contains(tag, query), MatchType::Tag, TAG_SCORE);
    }
    score
}

/// Scores a node against an already lower-cased query
fn score_node(node: &Node, query: &str) -> Score {
    let mut score = Score::default();
    score.add(contains(&node.name, query), MatchType::Name, NAME_SCORE);
    score.add(
        node.description.as_deref().is_some_and(|d| contains(d, query)),
        MatchType::Description,
        DESCRIPTION_SCORE,
    );
    score
}

/// Searches diagrams by name, description and tags.
///
/// With a non-empty `tags` filter a diagram is kept when it carries every
/// listed tag (ignoring case), whatever its score. Without one, only
/// diagrams scoring above zero are kept. An empty query matches every name.
pub fn search_diagrams<B: Backend>(
    store: &DiagramStore<B>,
    query: &str,
    tags: &[String],
) -> Result<Vec<SearchResult>, StoreError> {
    let query = query.to_lowercase();

    let results: Vec<SearchResult> = store
        .list_all()?
        .into_iter()
        .filter_map(|diagram| {
            let score = score_diagram(&diagram, &query);

            let keep = if tags.is_empty() {
                score.total > 0.0
            } else {
                tags.iter().all(|tag| diagram.has_tag(tag))
            };

            keep.then(|| SearchResult {
                diagram,
                score: score.total,
                match_type: score.match_type,
            })
        })
        .collect();

    log::debug!("Search '{}' matched {} diagram(s)", query, results.len());
    Ok(results)
}

/// Searches nodes across every diagram by name and description.
///
/// Nodes of other types are skipped when `node_type` is given; every node of
/// that type is then returned, even with a score of zero.
pub fn search_nodes<B: Backend>(
    store: &DiagramStore<B>,
    query: &str,
    node_type: Option<NodeType>,
) -> Result<Vec<NodeSearchResult>, StoreError> {
    let query = query.to_lowercase();
    let mut results = Vec::new();

    for diagram in store.list_all()? {
        for node in &diagram.nodes {
            if node_type.is_some_and(|t| node.node_type != t) {
                continue;
            }

            let score = score_node(node, &query);
            if score.total > 0.0 || node_type.is_some() {
                results.push(NodeSearchResult {
                    node: node.clone(),
                    diagram_id: diagram.id.clone(),
                    diagram: diagram.clone(),
                    score: score.total,
                    match_type: score.match_type,
                });
            }
        }
    }

    log::debug!("Node search '{}' matched {} node(s)", query, results.len());
    Ok(results)
}
