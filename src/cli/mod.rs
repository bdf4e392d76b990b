//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Diagram | Document lifecycle | `new`, `list`, `show`, `import`, `delete`, `validate` |
//! | Raw | YAML text in and out | `raw get`, `raw put` |
//! | Hierarchy | Parent/child links | `link`, `unlink`, `children`, `parent`, `tree`, `check` |
//! | Search | Scored text search | `search`, `search-nodes` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and debug-level logging:
//! ```bash
//! flowgen --verbose tree checkout
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod diagram;
mod hierarchy;
mod search;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
