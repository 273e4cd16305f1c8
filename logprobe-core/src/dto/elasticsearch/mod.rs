//! Elasticsearch DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Index health as reported by `_cat/indices`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexHealth {
    Green,
    Yellow,
    Red,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for IndexHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexHealth::Green => "green",
            IndexHealth::Yellow => "yellow",
            IndexHealth::Red => "red",
            IndexHealth::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One row of `_cat/indices?format=JSON`
///
/// Counts are strings on the wire and may be absent for closed indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatIndexRow {
    pub health: Option<IndexHealth>,
    pub status: Option<String>,
    pub index: String,
    #[serde(rename = "docs.count")]
    pub docs_count: Option<String>,
}

/// Summary of one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    pub doc_count: u64,
    pub health: IndexHealth,
}

impl IndexSummary {
    /// Whether the index proves that documents were delivered
    ///
    /// A red (unassigned) index or an empty one is not proof.
    pub fn holds_data(&self) -> bool {
        self.health != IndexHealth::Red && self.doc_count > 0
    }
}

impl From<CatIndexRow> for IndexSummary {
    fn from(row: CatIndexRow) -> Self {
        Self {
            name: row.index,
            doc_count: row
                .docs_count
                .and_then(|count| count.parse().ok())
                .unwrap_or(0),
            health: row.health.unwrap_or(IndexHealth::Unknown),
        }
    }
}

/// Response of `<index>/_count`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Response of `<index>/_search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
    #[serde(default)]
    pub aggregations: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: Option<HitsTotal>,
    #[serde(default)]
    pub hits: Vec<Document>,
}

/// `hits.total` is an object since Elasticsearch 7 and a bare number before
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitsTotal {
    Object { value: u64, relation: Option<String> },
    Count(u64),
}

impl HitsTotal {
    pub fn value(&self) -> u64 {
        match self {
            HitsTotal::Object { value, .. } => *value,
            HitsTotal::Count(value) => *value,
        }
    }
}

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: JsonValue,
}

/// One bucket of a `terms` aggregation keyed by string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsBucket {
    pub key: String,
    pub doc_count: u64,
    #[serde(flatten)]
    pub sub_aggregations: serde_json::Map<String, JsonValue>,
}

impl TermsBucket {
    /// `doc_count` of a single-bucket sub-aggregation (e.g. a `filter`)
    pub fn sub_count(&self, name: &str) -> u64 {
        self.sub_aggregations
            .get(name)
            .and_then(|agg| agg.get("doc_count"))
            .and_then(JsonValue::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cat_indices_row_to_summary() {
        let body = r#"[
            {"health":"green","status":"open","index":"app-000001","uuid":"x","pri":"1","rep":"0","docs.count":"42","docs.deleted":"0"},
            {"health":"red","status":"open","index":"infra-000001","docs.count":"7"},
            {"health":"yellow","status":"close","index":"audit-000001","docs.count":null}
        ]"#;
        let rows: Vec<CatIndexRow> = serde_json::from_str(body).unwrap();
        let summaries: Vec<IndexSummary> = rows.into_iter().map(Into::into).collect();

        assert_eq!(summaries[0].doc_count, 42);
        assert!(summaries[0].holds_data());
        assert_eq!(summaries[1].health, IndexHealth::Red);
        assert!(!summaries[1].holds_data());
        assert_eq!(summaries[2].doc_count, 0);
        assert!(!summaries[2].holds_data());
    }

    #[test]
    fn test_search_response_with_both_total_shapes() {
        let v7 = r#"{"hits":{"total":{"value":3,"relation":"eq"},"hits":[{"_index":"app-000001","_id":"a","_source":{"message":"hi"}}]}}"#;
        let resp: SearchResponse = serde_json::from_str(v7).unwrap();
        assert_eq!(resp.hits.total.unwrap().value(), 3);
        assert_eq!(resp.hits.hits[0].source["message"], "hi");

        let v6 = r#"{"hits":{"total":5,"hits":[]}}"#;
        let resp: SearchResponse = serde_json::from_str(v6).unwrap();
        assert_eq!(resp.hits.total.unwrap().value(), 5);
    }

    #[test]
    fn test_terms_bucket_sub_count() {
        let body = r#"{"key":"worker-0","doc_count":10,"journal":{"doc_count":4},"container":{"doc_count":0}}"#;
        let bucket: TermsBucket = serde_json::from_str(body).unwrap();
        assert_eq!(bucket.sub_count("journal"), 4);
        assert_eq!(bucket.sub_count("container"), 0);
        assert_eq!(bucket.sub_count("missing"), 0);
    }
}
