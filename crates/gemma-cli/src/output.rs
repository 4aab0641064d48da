//! CLI console utilities

use colored::*;

/// Formatted status lines for commands that do not go through the view
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count()).dimmed());
    }

    /// Print a `key: value` line
    pub fn print_field(&self, key: &str, value: impl std::fmt::Display) {
        println!("  {:<28} {}", format!("{key}:").cyan(), value);
    }
}
