//! Configuration module
//!
//! Combines the engine settings read from the environment with the flags
//! given on the command line.

use anyhow::{Context, Result};
use clap::ValueEnum;
use logprobe_engine::Backend;
use std::time::Duration;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub engine: logprobe_engine::Config,
    pub format: OutputFormat,
}

impl Config {
    /// Loads engine settings from the environment, then applies flag overrides
    pub fn load(
        backend: Backend,
        poll_interval: Option<u64>,
        poll_timeout: Option<u64>,
        format: OutputFormat,
    ) -> Result<Self> {
        let mut engine =
            logprobe_engine::Config::from_env().context("Failed to read configuration")?;

        if let Some(secs) = poll_interval {
            engine.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = poll_timeout {
            engine.poll_timeout = Duration::from_secs(secs);
        }

        engine.validate().context("Invalid configuration")?;

        Ok(Self {
            backend,
            engine,
            format,
        })
    }
}
