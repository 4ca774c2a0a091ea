//! npm-install - dependency installation for Node.js application builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use npm_install::cli::{Cli, Commands, LogFormat};
use npm_install::config::{Environment, EnvironmentConfig, BP_LOG_LEVEL};
use npm_install::error::NpmResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> NpmResult<()> {
    let cli = Cli::parse();

    // 0 = BP_LOG_LEVEL (info by default), 1 = info, 2+ = debug
    let debug_requested = Environment::from_process()?
        .lookup(BP_LOG_LEVEL)
        .is_some_and(|level| level.eq_ignore_ascii_case("debug"));
    let filter = match cli.verbose {
        0 if debug_requested => EnvFilter::new("npm_install=debug"),
        0 | 1 => EnvFilter::new("npm_install=info"),
        _ => EnvFilter::new("npm_install=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    match cli.command {
        Commands::Build(args) => npm_install::cli::commands::build(args).await,
        Commands::SetupSymlinks(args) => npm_install::cli::commands::setup_symlinks(args).await,
    }
}
