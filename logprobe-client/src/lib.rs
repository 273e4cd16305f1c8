//! Logprobe backend clients
//!
//! Thin, typed clients for the query APIs of the log stores logprobe can
//! verify against:
//! - [`CloudWatchClient`]: CloudWatch Logs describe calls, signed with SigV4
//! - [`ElasticsearchClient`]: index listing, count and search over a pluggable transport
//! - [`LokiClient`]: range queries with transport-level retry
//!
//! # Example
//!
//! ```no_run
//! use logprobe_client::{CloudWatchClient, CloudWatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CloudWatchConfig::new("us-east-2", "AKID...", "secret...");
//!     let client = CloudWatchClient::new(config)?;
//!
//!     for group in client.describe_log_groups("cluster1-xyz.").await? {
//!         println!("{}", group.log_group_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cloudwatch;
pub mod elasticsearch;
pub mod error;
pub mod loki;
pub mod retry;

// Re-export commonly used types
pub use cloudwatch::{CloudWatchClient, CloudWatchConfig};
pub use elasticsearch::{ElasticsearchClient, ElasticsearchTransport, HttpTransport};
pub use error::{ClientError, Result};
pub use loki::{LokiClient, LokiConfig, LokiPathStyle};
pub use retry::RetryPolicy;

use serde::de::DeserializeOwned;

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an [`ClientError::ApiError`] if the
/// request failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let text = read_body(response).await?;

    serde_json::from_str(&text)
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response and return its body as text
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response.text().await?)
}
