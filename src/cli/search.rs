//! Search CLI commands

use anyhow::Result;

use super::output::Output;
use crate::domain::NodeType;
use crate::service::{search_diagrams, search_nodes, MatchType};
use crate::storage::DiagramStore;

fn match_label(match_type: Option<MatchType>) -> &'static str {
    match_type.map(|m| m.as_str()).unwrap_or("-")
}

fn by_score_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

pub fn diagrams(output: &Output, store: &DiagramStore, query: &str, tags: &[String]) -> Result<()> {
    let mut results = search_diagrams(store, query, tags)?;
    results.sort_by(|a, b| by_score_desc(a.score, b.score).then_with(|| a.diagram.id.cmp(&b.diagram.id)));
    output.verbose_ctx("search", &format!("Found {} results", results.len()));

    if output.is_json() {
        let items: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.diagram.id,
                    "name": r.diagram.name,
                    "score": r.score,
                    "matchType": r.match_type,
                    "tags": r.diagram.tags,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "results": items,
            "count": results.len(),
            "query": query,
            "tags": tags,
        }));
    } else if results.is_empty() {
        println!("No results found for '{}'", query);
    } else {
        println!("{:<20} {:>5} {:<12} NAME", "ID", "SCORE", "MATCH");
        println!("{}", "-".repeat(70));
        for r in &results {
            println!(
                "{:<20} {:>5.1} {:<12} {}",
                r.diagram.id,
                r.score,
                match_label(r.match_type),
                r.diagram.name
            );
        }
        println!();
        println!("Found {} result(s)", results.len());
    }

    Ok(())
}

pub fn nodes(
    output: &Output,
    store: &DiagramStore,
    query: &str,
    node_type: Option<NodeType>,
) -> Result<()> {
    let mut results = search_nodes(store, query, node_type)?;
    results.sort_by(|a, b| by_score_desc(a.score, b.score));
    output.verbose_ctx("search-nodes", &format!("Found {} results", results.len()));

    if output.is_json() {
        let items: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "diagramId": r.diagram_id,
                    "diagramName": r.diagram.name,
                    "node": r.node,
                    "score": r.score,
                    "matchType": r.match_type,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "results": items,
            "count": results.len(),
            "query": query,
            "type": node_type.map(|t| t.to_string()),
        }));
    } else if results.is_empty() {
        println!("No nodes found for '{}'", query);
    } else {
        println!("{:<20} {:<16} {:<11} {:>5}  NAME", "DIAGRAM", "NODE", "TYPE", "SCORE");
        println!("{}", "-".repeat(70));
        for r in &results {
            println!(
                "{:<20} {:<16} {:<11} {:>5.1}  {}",
                r.diagram_id,
                r.node.id,
                r.node.node_type.to_string(),
                r.score,
                r.node.name
            );
        }
        println!();
        println!("Found {} node(s)", results.len());
    }

    Ok(())
}
