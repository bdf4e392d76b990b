//! Diagram CLI commands

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{generate_diagram_id, parse_id, parse_version, validate, Diagram};
use crate::storage::{codec, DiagramStore, StoreError};

#[derive(Subcommand)]
pub enum RawCommands {
    /// Print the stored YAML text of a diagram
    Get {
        /// Diagram ID
        id: String,
    },

    /// Replace (or create) a diagram from YAML text
    Put {
        /// Diagram ID
        id: String,

        /// Read from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

pub fn run_raw(cmd: RawCommands, output: &Output, store: &DiagramStore) -> Result<()> {
    match cmd {
        RawCommands::Get { id } => raw_get(output, store, &id),
        RawCommands::Put { id, file } => raw_put(output, store, &id, file.as_deref()),
    }
}

/// Prints the validation errors carried by a rejected write
fn rejected(output: &Output, err: StoreError) -> anyhow::Error {
    match &err {
        StoreError::InvalidDocument(result) if output.is_json() => output.data(&serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "validation": result,
        })),
        StoreError::InvalidDocument(result) => output.validation("rejected", result),
        _ => {}
    }
    err.into()
}

fn print_saved(output: &Output, verb: &str, diagram: &Diagram) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "id": diagram.id,
            "name": diagram.name,
            "version": diagram.version,
            "file": diagram.location,
        }));
    } else {
        output.success(&format!("{} diagram: {} ({})", verb, diagram.id, diagram.name));
    }
}

pub fn list(output: &Output, store: &DiagramStore) -> Result<()> {
    let scan = store.scan()?;
    let mut diagrams = scan.diagrams;
    diagrams.sort_by(|a, b| a.id.cmp(&b.id));
    output.verbose_ctx(
        "list",
        &format!("{} diagram(s), {} skipped", diagrams.len(), scan.skipped.len()),
    );

    if output.is_json() {
        let items: Vec<_> = diagrams
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "version": d.version,
                    "nodes": d.nodes.len(),
                    "edges": d.edges.len(),
                    "tags": d.tags,
                    "parent": d.parent,
                    "children": d.children,
                    "file": d.location,
                })
            })
            .collect();
        output.data(&items);
    } else if diagrams.is_empty() {
        println!("No diagrams found.");
    } else {
        println!("{:<20} {:<10} {:>5} {:>5}  NAME", "ID", "VERSION", "NODES", "EDGES");
        println!("{}", "-".repeat(70));
        for d in &diagrams {
            println!(
                "{:<20} {:<10} {:>5} {:>5}  {}",
                d.id,
                d.version,
                d.nodes.len(),
                d.edges.len(),
                d.name
            );
        }
    }

    for skipped in &scan.skipped {
        eprintln!("Skipped {}: {}", skipped.key, skipped.reason);
    }

    Ok(())
}

pub fn show(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let diagram = store.get(id)?;

    if output.is_json() {
        output.data(&diagram);
        return Ok(());
    }

    println!("Diagram: {} ({})", diagram.id, diagram.version);
    println!("Name: {}", diagram.name);
    if let Some(description) = &diagram.description {
        println!("Description: {}", description);
    }
    if !diagram.tags.is_empty() {
        println!("Tags: {}", diagram.tags.join(", "));
    }
    if let Some(parent) = &diagram.parent {
        println!("Parent: {}", parent);
    }
    if !diagram.children.is_empty() {
        println!("Children: {}", diagram.children.join(", "));
    }
    println!("Created: {}", diagram.created.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", diagram.updated.format("%Y-%m-%d %H:%M"));
    if let Some(location) = &diagram.location {
        println!("File: {}", location);
    }

    if !diagram.nodes.is_empty() {
        println!("\nNodes ({}):", diagram.nodes.len());
        for node in &diagram.nodes {
            let drill = node
                .drill_down
                .as_deref()
                .map(|target| format!("  -> {}", target))
                .unwrap_or_default();
            println!(
                "  {:<16} {:<11} {}{}",
                node.id,
                node.node_type.to_string(),
                node.name,
                drill
            );
        }
    }

    if !diagram.edges.is_empty() {
        println!("\nEdges ({}):", diagram.edges.len());
        for edge in &diagram.edges {
            println!(
                "  {:<16} {} -> {} ({}) {}",
                edge.id, edge.from, edge.to, edge.edge_type, edge.name
            );
        }
    }

    Ok(())
}

pub fn new(
    output: &Output,
    store: &DiagramStore,
    name: &str,
    id: Option<String>,
    version: &str,
    description: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let id = match id {
        Some(id) => parse_id(&id)?,
        None => generate_diagram_id(name, Utc::now()),
    };
    let version = parse_version(version)?;
    output.verbose_ctx("new", &format!("Creating diagram {} ({})", id, version));

    let mut diagram = Diagram::new(id, name, version);
    diagram.description = description;
    diagram.tags = tags;

    let diagram = store.create(diagram).map_err(|e| rejected(output, e))?;
    print_saved(output, "Created", &diagram);
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn import(output: &Output, store: &DiagramStore, file: &Path) -> Result<()> {
    let text = read_file(file)?;
    let diagram =
        codec::parse(&text).with_context(|| format!("Failed to parse {}", file.display()))?;
    output.verbose_ctx("import", &format!("Importing {} from {}", diagram.id, file.display()));

    let diagram = store.create(diagram).map_err(|e| rejected(output, e))?;
    print_saved(output, "Imported", &diagram);
    Ok(())
}

pub fn delete(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let report = store.delete(id)?;

    if output.is_json() {
        output.data(&report);
    } else {
        output.success(&format!("Deleted diagram: {} ({})", report.id, report.key));
        for other in &report.detached {
            println!("  removed references from {}", other);
        }
    }

    Ok(())
}

fn finish_validation(output: &Output, subject: &str, diagram: &Diagram) -> Result<()> {
    let result = validate(diagram);

    if output.is_json() {
        output.data(&result);
    } else {
        output.validation(subject, &result);
    }

    if !result.valid {
        anyhow::bail!("{} is invalid: {}", subject, result.summary());
    }
    Ok(())
}

pub fn validate_stored(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let diagram = store.get(id)?;
    finish_validation(output, id, &diagram)
}

pub fn validate_file(output: &Output, file: &Path) -> Result<()> {
    let text = read_file(file)?;
    let diagram =
        codec::parse(&text).with_context(|| format!("Failed to parse {}", file.display()))?;
    finish_validation(output, &file.display().to_string(), &diagram)
}

fn raw_get(output: &Output, store: &DiagramStore, id: &str) -> Result<()> {
    let text = store.load_raw(id)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "text": text }));
    } else {
        print!("{}", text);
    }

    Ok(())
}

fn raw_put(output: &Output, store: &DiagramStore, id: &str, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => read_file(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read diagram from stdin")?;
            text
        }
    };

    let diagram = store.save_raw(id, &text).map_err(|e| rejected(output, e))?;
    print_saved(output, "Saved", &diagram);
    Ok(())
}
