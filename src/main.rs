//! azurearm - Azure Resource Manager execution and state functions
//!
//! This is the main entry point for the azurearm CLI.

mod cli;

use anyhow::Result;
use azurearm::config::{Config, LogFormat, LoggingConfig};
use cli::commands::{CommandContext, Runnable};
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            OutputFormatter::new(!cli.no_color, cli.output, cli.verbosity()).error(&format!("{:#}", e));
            e.downcast_ref::<azurearm::Error>()
                .map_or(1, azurearm::Error::exit_code)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(cli.verbosity(), &config.logging);

    if cli.verbosity() >= 2 {
        eprintln!("azurearm v{} by {}", azurearm::VERSION, AUTHORS);
    }

    let mut ctx = CommandContext::new(cli, config)?;
    let command: &dyn Runnable = match &cli.command {
        Commands::Call(args) => args,
        Commands::Apply(args) => args,
        Commands::Functions(args) => args,
    };
    command.run(&mut ctx).await
}

/// Initialize logging. `-v` flags pick the level, else the configured one;
/// `RUST_LOG` overrides both. Logs go to stderr so that command output stays
/// parseable.
fn init_logging(verbosity: u8, logging: &LoggingConfig) {
    let filter = match verbosity {
        0 => logging.level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
