//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::{ValidationError, ValidationResult};
use crate::storage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let json = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        match json {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to encode output: {}", e),
        }
    }

    /// Prints a validation result as an indented list (text only)
    pub fn validation(&self, subject: &str, result: &ValidationResult) {
        if self.is_json() {
            return;
        }

        let verdict = if result.valid { "valid" } else { "invalid" };
        println!(
            "{}: {} ({} error(s), {} warning(s))",
            subject,
            verdict,
            result.errors.len(),
            result.warnings.len()
        );
        for error in &result.errors {
            println!("  error   {}", issue_line(error));
        }
        for warning in &result.warnings {
            println!("  warning {}", issue_line(warning));
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

fn issue_line(issue: &ValidationError) -> String {
    format!("{:<24} {}: {}", issue.code.as_str(), issue.path, issue.message)
}
