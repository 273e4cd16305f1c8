//! Loki client
//!
//! Issues `query_range` calls, either through a LokiStack gateway (one path
//! per tenant, where the tenant is the log type) or directly against Loki.
//! Each call is retried at the HTTP layer according to a [`RetryPolicy`].

use logprobe_core::dto::loki::{QueryRangeParams, QueryRangeResponse};
use reqwest::Client;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::handle_response;
use crate::retry::{RetryPolicy, with_retry};

/// How the query path is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LokiPathStyle {
    /// `<base>/api/logs/v1/<tenant>/loki/api/v1/query_range`
    #[default]
    Gateway,
    /// `<base>/loki/api/v1/query_range`
    Direct,
}

/// Connection settings for Loki
#[derive(Clone)]
pub struct LokiConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    /// Sent as `X-Scope-OrgID`
    pub org_id: Option<String>,
    /// Sent as `X-Query-Tags`
    pub query_tags: Option<String>,
    pub path_style: LokiPathStyle,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for LokiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("query_tags", &self.query_tags)
            .field("path_style", &self.path_style)
            .field("retry", &self.retry)
            .finish()
    }
}

impl LokiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
            org_id: None,
            query_tags: None,
            path_style: LokiPathStyle::Gateway,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_query_tags(mut self, tags: impl Into<String>) -> Self {
        self.query_tags = Some(tags.into());
        self
    }

    pub fn with_path_style(mut self, style: LokiPathStyle) -> Self {
        self.path_style = style;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// HTTP client for Loki range queries
#[derive(Debug, Clone)]
pub struct LokiClient {
    config: LokiConfig,
    client: Client,
}

impl LokiClient {
    pub fn new(config: LokiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: LokiConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &LokiConfig {
        &self.config
    }

    /// URL of the `query_range` endpoint for `tenant`
    pub fn query_range_url(&self, tenant: &str) -> String {
        match self.config.path_style {
            LokiPathStyle::Gateway => format!(
                "{}/api/logs/v1/{}/loki/api/v1/query_range",
                self.config.base_url, tenant
            ),
            LokiPathStyle::Direct => format!("{}/loki/api/v1/query_range", self.config.base_url),
        }
    }

    /// Runs a range query for `tenant` (the log type)
    ///
    /// Transient failures are retried up to the configured attempt count. A
    /// response whose `status` is not `success` is an error.
    pub async fn query_range(
        &self,
        tenant: &str,
        params: &QueryRangeParams,
    ) -> Result<QueryRangeResponse> {
        let endpoint = self.query_range_url(tenant);
        let url = endpoint.as_str();
        let what = format!("Loki query_range {}", params.query);

        let response: QueryRangeResponse =
            with_retry(self.config.retry, &what, move || self.send_once(url, params)).await?;

        if !response.is_success() {
            return Err(ClientError::ParseError(format!(
                "Loki returned status {:?}",
                response.status
            )));
        }

        debug!(
            "{} returned {} stream(s)",
            what,
            response.data.result.len()
        );
        Ok(response)
    }

    async fn send_once(&self, url: &str, params: &QueryRangeParams) -> Result<QueryRangeResponse> {
        let mut request = self.client.get(url).query(&params.to_query_pairs());

        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(org_id) = &self.config.org_id {
            request = request.header("X-Scope-OrgID", org_id);
        }
        if let Some(tags) = &self.config.query_tags {
            request = request.header("X-Query-Tags", tags);
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}
