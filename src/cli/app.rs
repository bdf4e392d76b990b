//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{diagram, hierarchy, search};
use crate::domain::NodeType;
use crate::storage::{Config, DiagramStore, Project};

#[derive(Parser)]
#[command(name = "flowgen")]
#[command(author, version, about = "Hierarchical flow diagrams as diff-friendly YAML")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding diagram files
    #[arg(long, short = 'd', global = true, env = "FLOWGEN_DIAGRAMS_PATH")]
    pub diagrams: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new flowgen project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// List all diagrams
    List,

    /// Show diagram details
    Show {
        /// Diagram ID
        id: String,
    },

    /// Create an empty diagram
    #[command(disable_version_flag = true)]
    New {
        /// Diagram name
        name: String,

        /// Diagram ID (generated from the name when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Version (defaults to the configured default_version)
        #[arg(long)]
        version: Option<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },

    /// Create a diagram from a YAML file
    Import {
        /// Path to the YAML file
        file: PathBuf,
    },

    /// Delete a diagram and remove references to it
    Delete {
        /// Diagram ID
        id: String,
    },

    /// Validate a stored diagram or a file
    Validate {
        /// Diagram ID
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        id: Option<String>,

        /// Validate a YAML file instead of a stored diagram
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Read or write the stored YAML text
    #[command(subcommand)]
    Raw(diagram::RawCommands),

    /// List the children of a diagram
    Children {
        /// Parent diagram ID
        id: String,
    },

    /// Show the parent of a diagram
    Parent {
        /// Child diagram ID
        id: String,
    },

    /// Link a child diagram under a parent
    Link {
        /// Parent diagram ID
        parent: String,

        /// Child diagram ID
        child: String,

        /// Node in the parent that drills down into the child
        #[arg(long)]
        node: Option<String>,
    },

    /// Remove a parent/child link
    Unlink {
        /// Parent diagram ID
        parent: String,

        /// Child diagram ID
        child: String,
    },

    /// Show the hierarchy below a diagram
    Tree {
        /// Root diagram ID
        id: String,
    },

    /// Search diagrams by name, description and tags
    Search {
        /// Search query
        query: String,

        /// Require a tag (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
    },

    /// Search nodes across all diagrams
    SearchNodes {
        /// Search query
        #[arg(default_value = "")]
        query: String,

        /// Only nodes of this type
        #[arg(long = "type")]
        node_type: Option<NodeType>,
    },

    /// Check every diagram and the hierarchy for problems
    Check,
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let mut config = Config::load(&cwd)?;
    if let Some(path) = &cli.diagrams {
        config = config.with_diagrams_path(path);
    }

    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format, cli.verbose);

    output.verbose_ctx(
        "config",
        &format!("Diagrams directory: {}", config.diagrams_dir().display()),
    );

    if let Commands::Init { path } = &cli.command {
        output.verbose_ctx("init", &format!("Initializing project at: {}", path));
        let project = Project::init(path)?;
        output.verbose_ctx(
            "init",
            &format!("Diagrams directory: {}", project.diagrams_dir().display()),
        );
        output.success(&format!(
            "Initialized flowgen project at {}",
            project.root().display()
        ));
        return Ok(());
    }

    let store = DiagramStore::open(&config);

    match cli.command {
        Commands::Init { .. } => {}

        Commands::List => diagram::list(&output, &store)?,
        Commands::Show { id } => diagram::show(&output, &store, &id)?,
        Commands::New {
            name,
            id,
            version,
            description,
            tags,
        } => {
            let version = version.unwrap_or_else(|| config.project.default_version.clone());
            diagram::new(&output, &store, &name, id, &version, description, tags)?
        }
        Commands::Import { file } => diagram::import(&output, &store, &file)?,
        Commands::Delete { id } => diagram::delete(&output, &store, &id)?,
        Commands::Validate { id, file } => match (id, file) {
            (_, Some(file)) => diagram::validate_file(&output, &file)?,
            (Some(id), None) => diagram::validate_stored(&output, &store, &id)?,
            (None, None) => anyhow::bail!("Give a diagram ID or --file"),
        },
        Commands::Raw(cmd) => diagram::run_raw(cmd, &output, &store)?,

        Commands::Children { id } => hierarchy::children(&output, &store, &id)?,
        Commands::Parent { id } => hierarchy::parent(&output, &store, &id)?,
        Commands::Link {
            parent,
            child,
            node,
        } => hierarchy::link(&output, &store, &parent, &child, node.as_deref())?,
        Commands::Unlink { parent, child } => hierarchy::unlink(&output, &store, &parent, &child)?,
        Commands::Tree { id } => hierarchy::tree(&output, &store, &id)?,
        Commands::Check => hierarchy::check(&output, &store)?,

        Commands::Search { query, tags } => search::diagrams(&output, &store, &query, &tags)?,
        Commands::SearchNodes { query, node_type } => {
            search::nodes(&output, &store, &query, node_type)?
        }
    }

    output.verbose("Command completed successfully");
    Ok(())
}
