//! Elasticsearch store
//!
//! Elasticsearch has no named groups: each category lives in an index family
//! (`app-*`, `infra-*`, `audit-*`) and namespaces are a document field. A
//! lookup is satisfied when the family has a non-red index holding documents
//! and, for namespace lookups, at least one document of that namespace.
//! Stream identities come from one aggregation query per group.

use async_trait::async_trait;
use logprobe_client::{ClientError, ElasticsearchClient, Result};
use logprobe_core::domain::{
    AuditSubtype, GroupKey, LogCategory, LogGroup, LogStream, NodeSource, StreamIdentity,
};
use logprobe_core::dto::elasticsearch::TermsBucket;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::{Backend, GroupLookup, LogStore};

/// Maximum hosts returned by the infrastructure aggregation
const MAX_HOSTS: u32 = 1000;

const LINUX_AUDIT_FILE: &str = "/var/log/audit/audit.log";
const OVN_AUDIT_FILE: &str = "/var/log/ovn/acl-audit-log.log";

/// Index name prefix for a category
pub fn index_family(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Application => "app",
        LogCategory::Infrastructure => "infra",
        LogCategory::Audit => "audit",
    }
}

/// [`LogStore`] over Elasticsearch indices
#[derive(Clone)]
pub struct ElasticsearchStore {
    client: ElasticsearchClient,
}

impl ElasticsearchStore {
    pub fn new(client: ElasticsearchClient) -> Self {
        Self { client }
    }

    async fn namespace_has_documents(&self, field: &str, value: &str) -> Result<bool> {
        let query = json!({ "query": { "term": { field: value } } });
        let count = self
            .client
            .count(index_family(LogCategory::Application), &query)
            .await?;
        Ok(count > 0)
    }

    async fn infrastructure_streams(&self, node: Option<&str>) -> Result<Vec<LogStream>> {
        let mut query = json!({
            "size": 0,
            "aggs": {
                "hosts": {
                    "terms": { "field": "hostname", "size": MAX_HOSTS },
                    "aggs": {
                        "journal": { "filter": { "exists": { "field": "systemd" } } },
                        "container": { "filter": { "exists": { "field": "kubernetes" } } }
                    }
                }
            }
        });
        if let Some(node) = node {
            query["query"] = json!({ "term": { "hostname": node } });
        }
        let response = self
            .client
            .search(index_family(LogCategory::Infrastructure), &query)
            .await?;

        let buckets: Vec<TermsBucket> = match aggregation(&response.aggregations, "hosts")
            .and_then(|hosts| hosts.get("buckets"))
        {
            Some(buckets) => serde_json::from_value(buckets.clone()).map_err(|e| {
                ClientError::ParseError(format!("Failed to parse host buckets: {}", e))
            })?,
            None => Vec::new(),
        };

        let mut streams = Vec::new();
        for bucket in &buckets {
            for (source, agg) in [
                (NodeSource::Journal, "journal"),
                (NodeSource::ContainerRuntime, "container"),
            ] {
                if bucket.sub_count(agg) > 0 {
                    streams.push(LogStream::with_identity(
                        format!("{}:{}", bucket.key, agg),
                        StreamIdentity::node(bucket.key.clone(), source),
                    ));
                }
            }
        }
        Ok(streams)
    }

    async fn audit_streams(&self) -> Result<Vec<LogStream>> {
        let query = json!({
            "size": 0,
            "aggs": {
                "subtypes": {
                    "filters": {
                        "filters": {
                            "k8s": { "exists": { "field": "k8s_audit_level" } },
                            "openshift": { "exists": { "field": "openshift_audit_level" } },
                            "linux": { "bool": { "should": [
                                { "exists": { "field": "auditd" } },
                                { "term": { "file": LINUX_AUDIT_FILE } }
                            ] } },
                            "ovn": { "term": { "file": OVN_AUDIT_FILE } }
                        }
                    }
                }
            }
        });
        let response = self
            .client
            .search(index_family(LogCategory::Audit), &query)
            .await?;
        let buckets =
            aggregation(&response.aggregations, "subtypes").and_then(|s| s.get("buckets"));

        Ok(AuditSubtype::ALL
            .into_iter()
            .filter(|subtype| {
                buckets
                    .and_then(|b| b.get(subtype.to_string()))
                    .and_then(|b| b.get("doc_count"))
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0)
                    > 0
            })
            .map(|subtype| {
                LogStream::with_identity(
                    format!("audit:{}", subtype),
                    StreamIdentity::Audit(subtype),
                )
            })
            .collect())
    }
}

fn aggregation<'a>(aggregations: &'a Option<JsonValue>, name: &str) -> Option<&'a JsonValue> {
    aggregations.as_ref().and_then(|aggs| aggs.get(name))
}

#[async_trait]
impl LogStore for ElasticsearchStore {
    fn backend(&self) -> Backend {
        Backend::Elasticsearch
    }

    async fn list_groups(&self, lookup: &GroupLookup) -> Result<Vec<LogGroup>> {
        let family = index_family(lookup.category);
        let indices = self.client.list_indices(family).await?;

        for index in indices.iter().filter(|index| !index.holds_data()) {
            debug!(
                "Ignoring index {} (health {}, {} docs)",
                index.name, index.health, index.doc_count
            );
        }
        if !indices.iter().any(|index| index.holds_data()) {
            return Ok(Vec::new());
        }

        let present = match &lookup.key {
            GroupKey::Category(_) => true,
            GroupKey::NamespaceName(name) => {
                self.namespace_has_documents("kubernetes.namespace_name", name)
                    .await?
            }
            GroupKey::NamespaceUid(uid) => {
                self.namespace_has_documents("kubernetes.namespace_id", &uid.to_string())
                    .await?
            }
        };

        if !present {
            return Ok(Vec::new());
        }

        let mut group = LogGroup::new(lookup.name.clone(), lookup.category);
        group.scope_key = lookup.key.scope();
        Ok(vec![group])
    }

    async fn list_streams(&self, group: &LogGroup, node: Option<&str>) -> Result<Vec<LogStream>> {
        match group.category {
            LogCategory::Application => Ok(Vec::new()),
            LogCategory::Infrastructure => self.infrastructure_streams(node).await,
            LogCategory::Audit => self.audit_streams().await,
        }
    }
}
