//! CLI module for azurearm
//!
//! This module provides the command-line interface: argument parsing and
//! the `call`, `apply` and `functions` subcommands.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// azurearm - Azure Resource Manager execution and state functions
#[derive(Parser, Debug, Clone)]
#[command(name = "azurearm")]
#[command(author = "Azurearm Contributors")]
#[command(version)]
#[command(about = "Azure Resource Manager execution and state functions", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Report what states would change without changing anything
    #[arg(long = "check", global = true)]
    pub check_mode: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "AZUREARM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential profile from the configuration
    #[arg(short = 'p', long, global = true, env = "AZUREARM_PROFILE")]
    pub profile: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Call one execution or state function
    Call(commands::call::CallArgs),

    /// Apply the states of a state file, in file order
    Apply(commands::apply::ApplyArgs),

    /// List registered functions
    Functions(commands::functions::FunctionsArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "azurearm",
            "-vv",
            "--check",
            "--output",
            "json",
            "-p",
            "prod",
            "functions",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        assert!(cli.check_mode);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.profile.as_deref(), Some("prod"));
        assert!(matches!(cli.command, Commands::Functions(_)));
    }

    #[test]
    fn test_verbosity_is_capped() {
        let cli = Cli::try_parse_from(["azurearm", "-vvvvv", "functions"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }
}
