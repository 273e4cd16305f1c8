//! logprobe CLI
//!
//! Verifies from the command line that logs reached CloudWatch Logs,
//! Elasticsearch or Loki. Backend credentials come from the environment.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, OutputFormat};
use logprobe_engine::Backend;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logprobe")]
#[command(about = "Verify that logs reached a remote log store", long_about = None)]
struct Cli {
    /// Log store to query (cloudwatch, elasticsearch, loki)
    #[arg(long, short, env = "LOGPROBE_BACKEND")]
    backend: Backend,

    /// Seconds between two attempts
    #[arg(long, env = "POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Seconds allowed per category
    #[arg(long, env = "POLL_TIMEOUT")]
    poll_timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logprobe_engine=info,logprobe_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.backend, cli.poll_interval, cli.poll_timeout, cli.format)?;

    handle_command(cli.command, &config).await
}
