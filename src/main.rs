//! flowgen - hierarchical flow diagrams as diff-friendly YAML

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = flowgen::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
