use anyhow::{Context, Result};
use clap::Parser;
use dealflow::{BoardContext, BoardOperationProcessor, DealflowConfig, DealflowError};
use serde_json::Value;
use std::process;

mod cli;
mod commands;

use cli::{Cli, Commands, OutputFormat};

const EXIT_SUCCESS: i32 = 0;
/// Bad input or a missing record
const EXIT_WARNING: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let code = match run(cli).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    };
    process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = DealflowConfig::load().context("failed to load configuration")?;
    if let Some(db) = &cli.db {
        config = config.with_database_path(db);
    }
    tracing::debug!(database = %config.database_path.display(), team = %cli.team, "starting");

    let database = config.database_path.clone();
    let ctx = BoardContext::from_config(config)
        .with_context(|| format!("failed to open database {}", database.display()))?;
    if !matches!(cli.command, Commands::Init) {
        ctx.ensure_initialized()
            .context("run `dealflow init` first")?;
    }

    let processor = match &cli.actor {
        Some(actor) => BoardOperationProcessor::with_actor(actor.as_str()),
        None => BoardOperationProcessor::new(),
    };

    let output = commands::dispatch(&cli, &ctx, &processor).await?;
    print_output(&output, cli.format)
}

fn print_output(value: &Value, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DealflowError>() {
        Some(e)
            if e.is_validation()
                || matches!(
                    e,
                    DealflowError::CardNotFound { .. }
                        | DealflowError::NotFound { .. }
                        | DealflowError::NotInitialized { .. }
                ) =>
        {
            EXIT_WARNING
        }
        _ => EXIT_ERROR,
    }
}

/// Logs go to stderr so stdout stays parseable
fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
