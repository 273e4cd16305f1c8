//! Loki store
//!
//! Loki has no named groups either. The tenant is the log type, a group exists
//! when a bounded range query over the lookback window returns at least one
//! entry, and stream identities are read from the labels of the returned
//! streams.
//!
//! Range query limits count entries, not streams. Node streams are therefore
//! looked up with one single-entry query per node and source when a node is
//! given.

use async_trait::async_trait;
use chrono::Utc;
use logprobe_client::{LokiClient, Result};
use logprobe_core::domain::{
    AuditSubtype, GroupKey, LogCategory, LogGroup, LogStream, NodeSource, StreamIdentity,
};
use logprobe_core::dto::loki::{Direction, LokiStream, QueryRangeParams};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{Backend, GroupLookup, LogStore};

/// Default window searched back from now
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(3600);

/// Default number of streams requested per discovery query
pub const DEFAULT_STREAM_LIMIT: u32 = 1000;

/// `log_source` label values of audit streams
const AUDIT_SOURCES: [(&str, AuditSubtype); 4] = [
    ("kubeAPI", AuditSubtype::K8s),
    ("openshiftAPI", AuditSubtype::Openshift),
    ("auditd", AuditSubtype::Linux),
    ("ovn", AuditSubtype::Ovn),
];

/// [`LogStore`] over Loki range queries
#[derive(Debug, Clone)]
pub struct LokiStore {
    client: LokiClient,
    lookback: Duration,
    stream_limit: u32,
}

impl LokiStore {
    pub fn new(client: LokiClient) -> Self {
        Self {
            client,
            lookback: DEFAULT_LOOKBACK,
            stream_limit: DEFAULT_STREAM_LIMIT,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    async fn query(
        &self,
        category: LogCategory,
        query: String,
        limit: u32,
    ) -> Result<Vec<LokiStream>> {
        let end = Utc::now();
        let lookback = chrono::Duration::from_std(self.lookback)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let params = QueryRangeParams {
            query,
            limit,
            start: end - lookback,
            end,
            direction: Direction::Backward,
        };

        let response = self.client.query_range(category.as_str(), &params).await?;
        Ok(response
            .data
            .result
            .into_iter()
            .filter(|stream| !stream.values.is_empty())
            .collect())
    }
}

/// Quotes a LogQL label value
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Builds a stream selector from `(label, operator, value)` matchers
fn selector(category: LogCategory, matchers: &[(&str, &str, &str)]) -> String {
    let mut parts = vec![format!("log_type={}", quote(category.as_str()))];
    parts.extend(
        matchers
            .iter()
            .map(|(label, op, value)| format!("{}{}{}", label, op, quote(value))),
    );
    format!("{{{}}}", parts.join(", "))
}

/// Queries selecting the container and journal entries of `node`
pub fn node_queries(node: &str) -> [String; 2] {
    let category = LogCategory::Infrastructure;
    [
        selector(
            category,
            &[
                ("kubernetes_host", "=", node),
                ("kubernetes_namespace_name", "=~", ".+"),
            ],
        ),
        selector(
            category,
            &[
                ("kubernetes_host", "=", node),
                ("kubernetes_namespace_name", "=", ""),
            ],
        ),
    ]
}

/// Query that selects any entry belonging to `lookup`
pub fn group_query(lookup: &GroupLookup) -> String {
    match &lookup.key {
        GroupKey::Category(category) => selector(*category, &[]),
        GroupKey::NamespaceName(name) => selector(
            lookup.category,
            &[("kubernetes_namespace_name", "=", name.as_str())],
        ),
        GroupKey::NamespaceUid(uid) => format!(
            "{} | json | kubernetes_namespace_id={}",
            selector(lookup.category, &[]),
            quote(&uid.to_string())
        ),
    }
}

/// Reads a stream identity from a Loki label set
pub fn identity_from_labels(
    category: LogCategory,
    labels: &BTreeMap<String, String>,
) -> Option<StreamIdentity> {
    let label = |name: &str| labels.get(name).map(String::as_str).filter(|v| !v.is_empty());

    match category {
        LogCategory::Application => None,
        LogCategory::Audit => {
            let source = label("log_source")?;
            AUDIT_SOURCES
                .iter()
                .find(|(name, _)| *name == source)
                .map(|(_, subtype)| StreamIdentity::Audit(*subtype))
        }
        LogCategory::Infrastructure => {
            let node = label("kubernetes_host")?;
            let source = match label("log_source") {
                Some("container") => NodeSource::ContainerRuntime,
                Some("node") => NodeSource::Journal,
                Some(_) => return None,
                None if label("kubernetes_namespace_name").is_some() => {
                    NodeSource::ContainerRuntime
                }
                None => NodeSource::Journal,
            };
            Some(StreamIdentity::node(node, source))
        }
    }
}

fn stream_name(labels: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, quote(v)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

#[async_trait]
impl LogStore for LokiStore {
    fn backend(&self) -> Backend {
        Backend::Loki
    }

    async fn list_groups(&self, lookup: &GroupLookup) -> Result<Vec<LogGroup>> {
        let streams = self.query(lookup.category, group_query(lookup), 1).await?;
        if streams.is_empty() {
            debug!("No entries for {} in tenant {}", lookup.key, lookup.category);
            return Ok(Vec::new());
        }

        let mut group = LogGroup::new(lookup.name.clone(), lookup.category);
        group.scope_key = lookup.key.scope();
        Ok(vec![group])
    }

    async fn list_streams(&self, group: &LogGroup, node: Option<&str>) -> Result<Vec<LogStream>> {
        let category = group.category;
        let queries: Vec<(String, u32)> = match (category, node) {
            (LogCategory::Application, _) => return Ok(Vec::new()),
            (LogCategory::Infrastructure, Some(node)) => node_queries(node)
                .into_iter()
                .map(|query| (query, 1))
                .collect(),
            (LogCategory::Infrastructure, None) => vec![
                (
                    selector(category, &[("kubernetes_namespace_name", "=~", ".+")]),
                    self.stream_limit,
                ),
                (
                    selector(category, &[("kubernetes_namespace_name", "=", "")]),
                    self.stream_limit,
                ),
            ],
            (LogCategory::Audit, _) => AUDIT_SOURCES
                .iter()
                .map(|(source, _)| {
                    (
                        selector(category, &[("log_source", "=", *source)]),
                        1,
                    )
                })
                .collect(),
        };

        let mut seen = BTreeMap::new();
        for (query, limit) in queries {
            for stream in self.query(category, query, limit).await? {
                let name = stream_name(&stream.stream);
                let identity = identity_from_labels(category, &stream.stream);
                seen.entry(name).or_insert(identity);
            }
        }

        Ok(seen
            .into_iter()
            .map(|(name, identity)| LogStream { name, identity })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logprobe_client::{LokiConfig, RetryPolicy};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn http_ok(body: &str) -> String {
        format!(
            concat!(
                "HTTP/1.1 200 OK\r\n",
                "Content-Type: application/json\r\n",
                "Content-Length: {}\r\n",
                "Connection: close\r\n\r\n{}"
            ),
            body.len(),
            body
        )
    }

    fn streams_body(streams: &[&[(&str, &str)]]) -> String {
        let result: Vec<_> = streams
            .iter()
            .map(|pairs| {
                serde_json::json!({
                    "stream": labels(pairs),
                    "values": [["1700000000000000000", "line"]],
                })
            })
            .collect();
        serde_json::json!({
            "status": "success",
            "data": { "resultType": "streams", "result": result },
        })
        .to_string()
    }

    /// Answers every request with `body`
    async fn serve(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(http_ok(body).as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn store(url: String) -> LokiStore {
        LokiStore::new(LokiClient::new(
            LokiConfig::new(url).with_retry(RetryPolicy::none()),
        ))
    }

    #[test]
    fn test_group_queries() {
        let by_type = GroupLookup::new(
            "p",
            LogCategory::Audit,
            GroupKey::Category(LogCategory::Audit),
        );
        assert_eq!(group_query(&by_type), r#"{log_type="audit"}"#);

        let by_name = GroupLookup::new(
            "p",
            LogCategory::Application,
            GroupKey::NamespaceName("ns-\"a\"".to_string()),
        );
        assert_eq!(
            group_query(&by_name),
            r#"{log_type="application", kubernetes_namespace_name="ns-\"a\""}"#
        );

        let uid = Uuid::parse_str("3f0a7c2e-8d4b-4c1a-9e55-0b6f1d2a7c90").unwrap();
        let by_uid = GroupLookup::new("p", LogCategory::Application, GroupKey::NamespaceUid(uid));
        assert_eq!(
            group_query(&by_uid),
            r#"{log_type="application"} | json | kubernetes_namespace_id="3f0a7c2e-8d4b-4c1a-9e55-0b6f1d2a7c90""#
        );
    }

    #[test]
    fn test_identity_from_audit_labels() {
        let audit = |source| {
            identity_from_labels(LogCategory::Audit, &labels(&[("log_source", source)]))
        };
        assert_eq!(audit("kubeAPI"), Some(StreamIdentity::Audit(AuditSubtype::K8s)));
        assert_eq!(
            audit("openshiftAPI"),
            Some(StreamIdentity::Audit(AuditSubtype::Openshift))
        );
        assert_eq!(audit("auditd"), Some(StreamIdentity::Audit(AuditSubtype::Linux)));
        assert_eq!(audit("ovn"), Some(StreamIdentity::Audit(AuditSubtype::Ovn)));
        assert_eq!(audit("syslog"), None);
    }

    #[test]
    fn test_identity_from_infrastructure_labels() {
        let container = labels(&[
            ("kubernetes_host", "worker-0"),
            ("kubernetes_namespace_name", "openshift-dns"),
        ]);
        assert_eq!(
            identity_from_labels(LogCategory::Infrastructure, &container),
            Some(StreamIdentity::node("worker-0", NodeSource::ContainerRuntime))
        );

        let journal = labels(&[("kubernetes_host", "worker-0"), ("log_source", "node")]);
        assert_eq!(
            identity_from_labels(LogCategory::Infrastructure, &journal),
            Some(StreamIdentity::node("worker-0", NodeSource::Journal))
        );

        let no_host = labels(&[("log_source", "container")]);
        assert_eq!(identity_from_labels(LogCategory::Infrastructure, &no_host), None);
    }

    #[tokio::test]
    async fn test_group_found_when_entries_returned() {
        let url = serve(
            r#"{"status":"success","data":{"resultType":"streams","result":[{"stream":{"log_type":"audit","log_source":"auditd"},"values":[["1700000000000000000","line"]]}]}}"#,
        )
        .await;
        let lookup = GroupLookup::new(
            "p",
            LogCategory::Audit,
            GroupKey::Category(LogCategory::Audit),
        );
        let groups = store(url).list_groups(&lookup).await.unwrap();
        assert_eq!(groups, vec![LogGroup::new("p.audit", LogCategory::Audit)]);
    }

    #[tokio::test]
    async fn test_group_missing_when_result_empty() {
        let url = serve(r#"{"status":"success","data":{"resultType":"streams","result":[]}}"#)
            .await;
        let lookup = GroupLookup::new(
            "p",
            LogCategory::Application,
            GroupKey::NamespaceName("ns-a".to_string()),
        );
        assert!(store(url).list_groups(&lookup).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_streams_are_deduplicated_across_queries() {
        let url = serve(
            r#"{"status":"success","data":{"resultType":"streams","result":[{"stream":{"log_type":"infrastructure","kubernetes_host":"worker-0","log_source":"node"},"values":[["1700000000000000000","line"]]}]}}"#,
        )
        .await;
        let group = LogGroup::new("p.infrastructure", LogCategory::Infrastructure);
        let streams = store(url).list_streams(&group, None).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(
            streams[0].identity,
            Some(StreamIdentity::node("worker-0", NodeSource::Journal))
        );
    }

    #[test]
    fn test_node_queries() {
        let [container, journal] = node_queries("worker-1");
        assert_eq!(
            container,
            r#"{log_type="infrastructure", kubernetes_host="worker-1", kubernetes_namespace_name=~".+"}"#
        );
        assert_eq!(
            journal,
            r#"{log_type="infrastructure", kubernetes_host="worker-1", kubernetes_namespace_name=""}"#
        );
    }

    /// Answers each range query with the streams of the node it selects and
    /// records the decoded query string
    async fn serve_per_node(queries: Arc<Mutex<Vec<String>>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).to_string();
                let target = head.split_whitespace().nth(1).unwrap_or("").to_string();
                let url = reqwest::Url::parse(&format!("http://localhost{}", target)).unwrap();
                let query = url
                    .query_pairs()
                    .find(|(k, _)| k == "query")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                queries.lock().unwrap().push(query.clone());

                let body = if query.contains(r#"kubernetes_host="worker-0""#) {
                    // worker-0 alone would fill a broad query
                    if query.contains("=~") {
                        streams_body(&[&[
                            ("kubernetes_host", "worker-0"),
                            ("kubernetes_namespace_name", "openshift-dns"),
                        ]])
                    } else {
                        streams_body(&[&[("kubernetes_host", "worker-0"), ("log_source", "node")]])
                    }
                } else if query.contains(r#"kubernetes_host="worker-1""#) {
                    if query.contains("=~") {
                        streams_body(&[&[
                            ("kubernetes_host", "worker-1"),
                            ("kubernetes_namespace_name", "openshift-sdn"),
                        ]])
                    } else {
                        streams_body(&[])
                    }
                } else {
                    streams_body(&[&[
                        ("kubernetes_host", "worker-0"),
                        ("kubernetes_namespace_name", "openshift-dns"),
                    ]])
                };
                let _ = socket.write_all(http_ok(&body).as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_node_streams_queried_per_node() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let store = store(serve_per_node(queries.clone()).await);
        let group = LogGroup::new("p.infrastructure", LogCategory::Infrastructure);

        let mut identities = Vec::new();
        for node in ["worker-0", "worker-1"] {
            let streams = store.list_streams(&group, Some(node)).await.unwrap();
            identities.extend(streams.into_iter().filter_map(|s| s.identity));
        }

        assert_eq!(
            identities,
            vec![
                StreamIdentity::node("worker-0", NodeSource::ContainerRuntime),
                StreamIdentity::node("worker-0", NodeSource::Journal),
                StreamIdentity::node("worker-1", NodeSource::ContainerRuntime),
            ]
        );
        let queries = queries.lock().unwrap();
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().all(|q| q.contains("kubernetes_host=")));
    }
}
