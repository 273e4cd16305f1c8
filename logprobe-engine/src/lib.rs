//! Log delivery verification engine
//!
//! Confirms that log records of the requested categories reached a remote log
//! store (CloudWatch Logs, Elasticsearch or Loki). Remote state is eventually
//! consistent, so every check is a bounded poll that ends in a verdict.
//!
//! # Example
//!
//! ```no_run
//! use logprobe_core::domain::{LogCategory, VerificationRequest};
//! use logprobe_engine::{Backend, Config, Verifier};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = config.store(Backend::Loki)?;
//!     let verifier = Verifier::from_config(store, &config)?;
//!
//!     let request = VerificationRequest::builder("cluster1-xyz")
//!         .category(LogCategory::Audit)
//!         .build();
//!     let result = verifier.verify_all(&request).await?;
//!     println!("success: {}", result.success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::VerifyError;
pub use scheduler::{Attempt, CancellationToken, PollOutcome, poll_until};
pub use service::{Classification, GroupClassifier, MatchReport, StreamMatcher, Verifier};
pub use store::{Backend, GroupLookup, LogStore};
