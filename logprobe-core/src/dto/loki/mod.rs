//! Loki DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Scan direction of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    #[default]
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// Parameters of `GET /loki/api/v1/query_range`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRangeParams {
    /// LogQL selector, e.g. `{log_type="audit"}`
    pub query: String,
    pub limit: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub direction: Direction,
}

impl QueryRangeParams {
    /// Query string pairs; timestamps are nanosecond epochs
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query.clone()),
            ("limit", self.limit.to_string()),
            ("start", nanos(&self.start).to_string()),
            ("end", nanos(&self.end).to_string()),
            ("direction", self.direction.to_string()),
        ]
    }
}

fn nanos(ts: &DateTime<Utc>) -> i128 {
    i128::from(ts.timestamp()) * 1_000_000_000 + i128::from(ts.timestamp_subsec_nanos())
}

/// Response envelope of `query_range`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRangeResponse {
    pub status: String,
    pub data: QueryData,
}

impl QueryRangeResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<LokiStream>,
    #[serde(default)]
    pub stats: Option<JsonValue>,
}

/// One stream of a `streams` result: its label set plus `[timestamp, line]` pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LokiStream {
    pub stream: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<(String, String)>,
}

impl LokiStream {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.stream.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_pairs_use_nanosecond_timestamps() {
        let params = QueryRangeParams {
            query: r#"{log_type="audit"}"#.to_string(),
            limit: 10,
            start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            end: Utc.timestamp_opt(1_700_000_060, 500).unwrap(),
            direction: Direction::Backward,
        };
        let pairs = params.to_query_pairs();
        assert_eq!(pairs[1], ("limit", "10".to_string()));
        assert_eq!(pairs[2], ("start", "1700000000000000000".to_string()));
        assert_eq!(pairs[3], ("end", "1700000060000000500".to_string()));
        assert_eq!(pairs[4], ("direction", "backward".to_string()));
    }

    #[test]
    fn test_query_range_response_parses() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "streams",
                "result": [
                    {"stream": {"log_type": "infrastructure", "kubernetes_host": "worker-0"},
                     "values": [["1700000000000000000", "line"]]}
                ],
                "stats": {"summary": {"totalEntriesReturned": 1}}
            }
        }"#;
        let resp: QueryRangeResponse = serde_json::from_str(body).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.data.result.len(), 1);
        assert_eq!(resp.data.result[0].label("kubernetes_host"), Some("worker-0"));
        assert_eq!(resp.data.result[0].values[0].1, "line");
    }
}
