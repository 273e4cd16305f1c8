//! Elasticsearch client
//!
//! Elasticsearch is often only reachable from inside the cluster, so requests
//! go through an [`ElasticsearchTransport`]. [`HttpTransport`] talks to a
//! reachable URL; other transports (such as exec into a pod running curl) can
//! be plugged in by the caller.

use async_trait::async_trait;
use logprobe_core::dto::elasticsearch::{
    CatIndexRow, CountResponse, Document, IndexSummary, SearchResponse,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::read_body;

/// Carries one request to Elasticsearch and returns the raw response body
#[async_trait]
pub trait ElasticsearchTransport: Send + Sync {
    /// Sends a request
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path and query relative to the cluster root, without a leading slash
    /// * `body` - Optional JSON body
    async fn send(&self, method: Method, path: &str, body: Option<&JsonValue>) -> Result<String>;
}

/// Transport over plain HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Authenticates every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ElasticsearchTransport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Option<&JsonValue>) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.client.request(method, &url);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        read_body(response).await
    }
}

/// Client for the index, count and search APIs
#[derive(Clone)]
pub struct ElasticsearchClient {
    transport: Arc<dyn ElasticsearchTransport>,
}

impl ElasticsearchClient {
    pub fn new(transport: Arc<dyn ElasticsearchTransport>) -> Self {
        Self { transport }
    }

    /// Client over [`HttpTransport`]
    pub fn http(base_url: impl Into<String>, token: Option<String>) -> Self {
        let mut transport = HttpTransport::new(base_url);
        if let Some(token) = token {
            transport = transport.with_token(token);
        }
        Self::new(Arc::new(transport))
    }

    /// Lists indices whose name starts with `prefix`
    pub async fn list_indices(&self, prefix: &str) -> Result<Vec<IndexSummary>> {
        let path = format!("_cat/indices/{}*?format=JSON", prefix);
        let rows: Vec<CatIndexRow> = self.get(&path, None).await?;
        debug!("_cat/indices for {}* returned {} row(s)", prefix, rows.len());
        Ok(rows.into_iter().map(IndexSummary::from).collect())
    }

    /// Counts documents matching `query` across `<index_pattern>*`
    pub async fn count(&self, index_pattern: &str, query: &JsonValue) -> Result<u64> {
        let path = format!("{}*/_count", index_pattern);
        let response: CountResponse = self.get(&path, Some(query)).await?;
        Ok(response.count)
    }

    /// Runs a search across `<index_pattern>*`
    pub async fn search(&self, index_pattern: &str, query: &JsonValue) -> Result<SearchResponse> {
        let path = format!("{}*/_search", index_pattern);
        self.get(&path, Some(query)).await
    }

    /// First document matching `query`, if any
    pub async fn first_document(
        &self,
        index_pattern: &str,
        query: &JsonValue,
    ) -> Result<Option<Document>> {
        let response = self.search(index_pattern, query).await?;
        Ok(response.hits.hits.into_iter().next())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, body: Option<&JsonValue>) -> Result<T> {
        let text = self.transport.send(Method::GET, path, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            ClientError::ParseError(format!("Failed to parse response of {}: {}", path, e))
        })
    }
}
