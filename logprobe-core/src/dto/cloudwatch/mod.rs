//! CloudWatch Logs DTOs
//!
//! CloudWatch Logs uses the AWS JSON 1.1 protocol with camelCase members.

use serde::{Deserialize, Serialize};

/// Body of a `DescribeLogGroups` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogGroupsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_group_name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogGroupsResponse {
    #[serde(default)]
    pub log_groups: Vec<LogGroupSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroupSummary {
    pub log_group_name: String,
    pub arn: Option<String>,
    /// Milliseconds since the epoch
    pub creation_time: Option<i64>,
    pub stored_bytes: Option<u64>,
}

/// Body of a `DescribeLogStreams` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsRequest {
    pub log_group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsResponse {
    #[serde(default)]
    pub log_streams: Vec<LogStreamSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStreamSummary {
    pub log_stream_name: String,
    pub creation_time: Option<i64>,
    pub last_event_timestamp: Option<i64>,
    pub last_ingestion_time: Option<i64>,
}

/// Error body returned by AWS JSON protocol services
#[derive(Debug, Clone, Deserialize)]
pub struct AwsErrorBody {
    /// Error code, sometimes prefixed with a namespace (`com.amazonaws...#Code`)
    #[serde(rename = "__type", default)]
    pub error_type: String,
    #[serde(alias = "Message", default)]
    pub message: String,
}

impl AwsErrorBody {
    /// Error code without any namespace prefix
    pub fn code(&self) -> &str {
        self.error_type
            .rsplit('#')
            .next()
            .unwrap_or(&self.error_type)
    }
}
