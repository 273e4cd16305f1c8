//! CloudWatch Logs client
//!
//! Speaks the AWS JSON 1.1 protocol directly: every call is a signed `POST /`
//! with an `X-Amz-Target` header naming the action. Only the two describe
//! actions needed to discover groups and streams are implemented.

pub mod sigv4;

use chrono::Utc;
use logprobe_core::dto::cloudwatch::{
    AwsErrorBody, DescribeLogGroupsRequest, DescribeLogGroupsResponse, DescribeLogStreamsRequest,
    DescribeLogStreamsResponse, LogGroupSummary, LogStreamSummary,
};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use sigv4::{SignableRequest, SigningParams};

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SERVICE: &str = "logs";

/// Upper bound on pages followed per describe call
const MAX_PAGES: usize = 100;

/// Static credentials and region for CloudWatch Logs
#[derive(Clone)]
pub struct CloudWatchConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// Overrides `https://logs.<region>.amazonaws.com` (e.g. for a local emulator)
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for CloudWatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudWatchConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl CloudWatchConfig {
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            endpoint: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Endpoint URL the client will call
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://logs.{}.amazonaws.com", self.region),
        }
    }
}

/// HTTP client for the CloudWatch Logs API
#[derive(Debug, Clone)]
pub struct CloudWatchClient {
    config: CloudWatchConfig,
    url: Url,
    host: String,
    client: Client,
}

impl CloudWatchClient {
    /// Create a new CloudWatch client
    ///
    /// Fails when the region or credentials are empty or the endpoint is not a URL.
    pub fn new(config: CloudWatchConfig) -> Result<Self> {
        Self::with_client(config, Client::new())
    }

    /// Create a new CloudWatch client with a custom HTTP client
    pub fn with_client(config: CloudWatchConfig, client: Client) -> Result<Self> {
        if config.region.trim().is_empty() {
            return Err(ClientError::InvalidRequest("AWS region is not set".to_string()));
        }
        if config.access_key_id.is_empty() || config.secret_access_key.is_empty() {
            return Err(ClientError::InvalidRequest(
                "AWS access key id and secret access key are required".to_string(),
            ));
        }

        let endpoint = config.endpoint_url();
        let url = Url::parse(&format!("{}/", endpoint)).map_err(|e| {
            ClientError::InvalidRequest(format!("invalid endpoint {}: {}", endpoint, e))
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ClientError::InvalidRequest(format!(
                    "endpoint {} has no host",
                    endpoint
                )));
            }
        };

        Ok(Self {
            config,
            url,
            host,
            client,
        })
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    /// Lists every log group whose name starts with `prefix`
    ///
    /// Follows `nextToken` pagination. An empty list means nothing is visible yet.
    pub async fn describe_log_groups(&self, prefix: &str) -> Result<Vec<LogGroupSummary>> {
        let mut groups = Vec::new();
        let mut next_token = None;

        for _ in 0..MAX_PAGES {
            let req = DescribeLogGroupsRequest {
                log_group_name_prefix: Some(prefix.to_string()),
                next_token: next_token.take(),
                limit: None,
            };
            let page: DescribeLogGroupsResponse = self.call("DescribeLogGroups", &req).await?;
            groups.extend(page.log_groups);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        if next_token.is_some() {
            warn!(
                "DescribeLogGroups({}) stopped after {} pages, listing is incomplete",
                prefix, MAX_PAGES
            );
        }
        debug!("DescribeLogGroups({}) returned {} group(s)", prefix, groups.len());
        Ok(groups)
    }

    /// Lists the streams of `group`, optionally filtered by name prefix
    ///
    /// A group that does not exist yet yields an empty list.
    pub async fn describe_log_streams(
        &self,
        group: &str,
        stream_prefix: Option<&str>,
    ) -> Result<Vec<LogStreamSummary>> {
        let mut streams = Vec::new();
        let mut next_token = None;

        for _ in 0..MAX_PAGES {
            let req = DescribeLogStreamsRequest {
                log_group_name: group.to_string(),
                log_stream_name_prefix: stream_prefix.map(str::to_string),
                next_token: next_token.take(),
                limit: None,
            };
            let page: DescribeLogStreamsResponse =
                match self.call("DescribeLogStreams", &req).await {
                    Ok(page) => page,
                    Err(e) if e.is_not_found() => {
                        debug!("Log group {} not found yet", group);
                        return Ok(Vec::new());
                    }
                    Err(e) => return Err(e),
                };
            streams.extend(page.log_streams);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        if next_token.is_some() {
            warn!(
                "DescribeLogStreams({}) stopped after {} pages, listing is incomplete",
                group, MAX_PAGES
            );
        }
        debug!("DescribeLogStreams({}) returned {} stream(s)", group, streams.len());
        Ok(streams)
    }

    /// Signs and sends one JSON protocol call
    async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        action: &str,
        body: &Req,
    ) -> Result<Resp> {
        let payload = serde_json::to_vec(body).map_err(|e| {
            ClientError::InvalidRequest(format!("Failed to encode {}: {}", action, e))
        })?;
        let target = format!("{}.{}", TARGET_PREFIX, action);

        let params = SigningParams {
            access_key_id: &self.config.access_key_id,
            secret_access_key: &self.config.secret_access_key,
            session_token: self.config.session_token.as_deref(),
            region: &self.config.region,
            service: SERVICE,
        };
        let signable = SignableRequest {
            method: "POST",
            host: &self.host,
            path: self.url.path(),
            headers: &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
            payload: &payload,
        };
        let signed = sigv4::sign(&params, &signable, Utc::now())?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let response = request.body(payload).send().await?;
        handle_aws_response(response).await
    }
}

/// Decode a JSON protocol response, mapping AWS error bodies to [`ClientError::AwsError`]
async fn handle_aws_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<AwsErrorBody>(&text) {
            Ok(body) if !body.error_type.is_empty() => ClientError::AwsError {
                status: status.as_u16(),
                code: body.code().to_string(),
                message: body.message,
            },
            _ => ClientError::api_error(status.as_u16(), text),
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}
