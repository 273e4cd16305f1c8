//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod inspect;
mod verify;

pub use inspect::InspectArgs;
pub use verify::VerifyArgs;

use anyhow::Result;
use clap::{Args, Subcommand};
use logprobe_core::domain::{GroupingStrategy, LogCategory, VerificationRequest};
use std::process::ExitCode;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Wait until the requested logs are present, then report per category
    Verify(VerifyArgs),
    /// List the groups and streams the store holds for a request, once
    Inspect(InspectArgs),
}

/// Flags describing which logs should exist
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Group name prefix (usually the cluster id)
    #[arg(long, short, env = "LOGPROBE_GROUP_PREFIX")]
    pub prefix: String,

    /// Categories to check; all when omitted
    #[arg(long = "category", short, value_delimiter = ',')]
    pub categories: Vec<LogCategory>,

    /// How application logs are grouped (logType, namespaceName, namespaceUUID)
    #[arg(long, short, default_value = "logType")]
    pub strategy: GroupingStrategy,

    /// Namespace names or UIDs, for namespaced strategies
    #[arg(long = "namespace", short, value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Nodes expected to ship infrastructure logs
    #[arg(long = "node", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Also require OVN audit logs
    #[arg(long)]
    pub ovn_audit: bool,
}

impl RequestArgs {
    /// Builds the request; no categories means all of them
    pub fn to_request(&self) -> VerificationRequest {
        let categories = if self.categories.is_empty() {
            LogCategory::ALL.to_vec()
        } else {
            self.categories.clone()
        };

        VerificationRequest::builder(self.prefix.clone())
            .categories(categories)
            .strategy(self.strategy)
            .namespaces(self.namespaces.iter().cloned())
            .nodes(self.nodes.iter().cloned())
            .ovn_audit_expected(self.ovn_audit)
            .build()
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// The process exit code: failure when any requested category is missing
pub async fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Verify(args) => verify::handle_verify(args, config).await,
        Commands::Inspect(args) => inspect::handle_inspect(args, config).await,
    }
}
