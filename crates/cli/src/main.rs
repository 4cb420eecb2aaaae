//! onionfetch entry point.
//!
//! Fetches one URL through the configured SOCKS proxy, or runs a cache
//! maintenance command. Logs go to stderr so stdout carries only the
//! document or command output.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use onionfetch_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Args, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("[error] {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load()?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout();
    match args.command {
        Some(Commands::Cache(command)) => commands::cache(&config, command, &mut stdout),
        None => commands::fetch(&config, args.fetch, &mut stdout).await,
    }
}
