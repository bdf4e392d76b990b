//! Hierarchy CLI commands

use anyhow::Result;

use super::output::Output;
use crate::domain::{validate, Diagram};
use crate::service::{Hierarchy, HierarchyNode, TraversalIssue};
use crate::storage::DiagramStore;

fn print_issues(issues: &[TraversalIssue]) {
    for issue in issues {
        eprintln!("Skipped: {}", issue);
    }
}

fn summary(d: &Diagram) -> serde_json::Value {
    serde_json::json!({
        "id": d.id,
        "name": d.name,
        "version": d.version,
        "parent": d.parent,
        "children": d.children,
    })
}

pub fn children(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let children = Hierarchy::new(store).get_children(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "parent": id,
            "children": children.diagrams.iter().map(summary).collect::<Vec<_>>(),
            "issues": children.issues,
        }));
    } else {
        if children.diagrams.is_empty() {
            println!("{} has no children.", id);
        }
        for child in &children.diagrams {
            println!("{:<20} {}", child.id, child.name);
        }
        print_issues(&children.issues);
    }

    Ok(())
}

pub fn parent(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let parent = Hierarchy::new(store).get_parent(id)?;

    if output.is_json() {
        output.data(&summary(&parent));
    } else {
        println!("{:<20} {}", parent.id, parent.name);
    }

    Ok(())
}

pub fn link(
    output: &Output,
    store: &DiagramStore,
    parent: &str,
    child: &str,
    node: Option<&str>,
) -> Result<()> {
    output.verbose_ctx("link", &format!("{} -> {} (node: {:?})", parent, child, node));
    let (parent, child) = Hierarchy::new(store).link(parent, child, node)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "parent": summary(&parent),
            "child": summary(&child),
            "node": node,
        }));
    } else {
        match node {
            Some(node) => output.success(&format!(
                "Linked {} under {} (node {} drills down)",
                child.id, parent.id, node
            )),
            None => output.success(&format!("Linked {} under {}", child.id, parent.id)),
        }
    }

    Ok(())
}

pub fn unlink(output: &Output, store: &DiagramStore, parent: &str, child: &str) -> Result<()> {
    let (parent, child) = Hierarchy::new(store).unlink(parent, child)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "parent": summary(&parent),
            "child": summary(&child),
        }));
    } else {
        output.success(&format!("Unlinked {} from {}", child.id, parent.id));
    }

    Ok(())
}

fn tree_json(node: &HierarchyNode) -> serde_json::Value {
    serde_json::json!({
        "id": node.diagram.id,
        "name": node.diagram.name,
        "children": node.children.iter().map(tree_json).collect::<Vec<_>>(),
    })
}

pub fn tree(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let tree = Hierarchy::new(store).tree(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "root": tree_json(&tree.root),
            "issues": tree.issues,
        }));
    } else {
        tree.root.walk(&mut |node, depth| {
            println!("{}{} ({})", "  ".repeat(depth), node.diagram.id, node.diagram.name);
        });
        print_issues(&tree.issues);
    }

    Ok(())
}

/// Validates every diagram and audits the hierarchy; fails if anything is
/// wrong
pub fn check(output: &Output, store: &DiagramStore) -> Result<()> {
    let scan = store.scan()?;
    let report = Hierarchy::new(store).audit()?;

    let mut invalid = Vec::new();
    let mut warnings = 0;
    for diagram in &scan.diagrams {
        let result = validate(diagram);
        warnings += result.warnings.len();
        if !result.valid {
            invalid.push((diagram.id.clone(), result));
        }
    }

    let problems = invalid.len() + scan.skipped.len() + report.issues.len();

    if output.is_json() {
        output.data(&serde_json::json!({
            "diagrams": scan.diagrams.len(),
            "skipped": scan.skipped,
            "invalid": invalid
                .iter()
                .map(|(id, result)| serde_json::json!({ "id": id, "validation": result }))
                .collect::<Vec<_>>(),
            "warnings": warnings,
            "hierarchy": report,
        }));
    } else {
        println!(
            "Checked {} diagram(s), {} link(s)",
            scan.diagrams.len(),
            report.links
        );
        for skipped in &scan.skipped {
            println!("  unreadable {}: {}", skipped.key, skipped.reason);
        }
        for (id, result) in &invalid {
            output.validation(id, result);
        }
        for issue in &report.issues {
            println!("  hierarchy  {}", issue);
        }
        if warnings > 0 {
            println!("{} warning(s); run 'flowgen validate <id>' for details", warnings);
        }
    }

    if problems > 0 {
        anyhow::bail!("{} problem(s) found", problems);
    }

    if !output.is_json() {
        println!("No problems found.");
    }
    Ok(())
}
