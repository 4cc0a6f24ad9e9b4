//! CLI entry point for the autoattach portal tool.

use std::process::ExitCode;

use anyhow::Result;
use autoattach_core::ResponseClass;
use clap::Parser;
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    init_tracing(default_level);
    debug!(?cli, "CLI arguments parsed");

    match run(&cli).await {
        Ok(class) => exit_code(class),
        Err(error) => {
            eprintln!("error: {error:#}");
            exit_code(ResponseClass::ErrorPage)
        }
    }
}

async fn run(cli: &Cli) -> Result<ResponseClass> {
    let file_config = app_config::load(cli.config.as_deref())?;
    commands::dispatch(cli, &file_config).await
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn exit_code(class: ResponseClass) -> ExitCode {
    ExitCode::from(u8::try_from(class.exit_code()).unwrap_or(1))
}
