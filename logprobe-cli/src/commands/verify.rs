//! Verify command handler
//!
//! Runs a full verification and prints one line per category. Ctrl-C cancels
//! the checks still pending; they are reported as failed.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use logprobe_core::domain::{VerificationRequest, VerificationResult};
use logprobe_engine::{CancellationToken, Verifier};
use std::process::ExitCode;
use tracing::warn;

use super::RequestArgs;
use crate::config::{Config, OutputFormat};

/// Arguments of `logprobe verify`
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Handle the verify command
///
/// # Arguments
/// * `args` - Request flags
/// * `config` - The CLI configuration
pub async fn handle_verify(args: VerifyArgs, config: &Config) -> Result<ExitCode> {
    let request = args.request.to_request();
    let store = config
        .engine
        .store(config.backend)
        .context("Failed to set up the log store")?;
    let verifier = Verifier::from_config(store, &config.engine)?;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending checks");
            canceller.cancel();
        }
    });

    if config.format == OutputFormat::Text {
        print_header(&request, config);
    }

    let result = verifier
        .verify_all_with_cancel(&request, &token)
        .await
        .context("Verification could not start")?;

    match config.format {
        OutputFormat::Text => print_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_header(request: &VerificationRequest, config: &Config) {
    println!(
        "{}",
        format!(
            "Verifying logs under {} on {}",
            request.group_prefix, config.backend
        )
        .bold()
    );
    println!(
        "  {}",
        format!(
            "poll every {:?}, give up after {:?}",
            config.engine.poll_interval, config.engine.poll_timeout
        )
        .dimmed()
    );
    println!();
}

/// Print per-category verdicts followed by the diagnostics
fn print_result(result: &VerificationResult) {
    for (category, found) in &result.per_category {
        let verdict = if *found {
            "found".green()
        } else {
            "missing".red()
        };
        println!("  {} {:<16} {}", "▸".cyan(), category.to_string().bold(), verdict);
    }

    if !result.diagnostics.is_empty() {
        println!();
        for line in &result.diagnostics {
            println!("  {}", line.yellow());
        }
    }

    println!();
    if result.success() {
        println!("{}", "✓ All requested logs found".green().bold());
    } else {
        println!("{}", "✗ Some requested logs are missing".red().bold());
    }
}
