//! Log categories and grouping strategies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Top-level partition of log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Application,
    Infrastructure,
    Audit,
}

impl LogCategory {
    /// All categories, in verification order
    pub const ALL: [LogCategory; 3] = [
        LogCategory::Application,
        LogCategory::Infrastructure,
        LogCategory::Audit,
    ];

    /// Lowercase name used in group names and queries
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Application => "application",
            LogCategory::Infrastructure => "infrastructure",
            LogCategory::Audit => "audit",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category or strategy name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl FromStr for LogCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "application" => Ok(LogCategory::Application),
            "infrastructure" => Ok(LogCategory::Infrastructure),
            "audit" => Ok(LogCategory::Audit),
            _ => Err(ParseError {
                kind: "log category",
                value: s.to_string(),
            }),
        }
    }
}

/// How application logs are bucketed into backend groups
///
/// Infrastructure and audit logs are always grouped by log type, whatever
/// strategy the request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupingStrategy {
    /// One group per log type (`<prefix>.application`)
    #[default]
    ByLogType,
    /// One group per namespace name (`<prefix>.<namespace>`)
    ByNamespaceName,
    /// One group per namespace UID (`<prefix>.<uid>`)
    ByNamespaceUuid,
}

impl GroupingStrategy {
    /// Whether groups are keyed by namespace rather than by log type
    pub fn is_namespaced(&self) -> bool {
        match self {
            GroupingStrategy::ByLogType => false,
            GroupingStrategy::ByNamespaceName | GroupingStrategy::ByNamespaceUuid => true,
        }
    }
}

impl fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupingStrategy::ByLogType => "logType",
            GroupingStrategy::ByNamespaceName => "namespaceName",
            GroupingStrategy::ByNamespaceUuid => "namespaceUUID",
        };
        f.write_str(name)
    }
}

impl FromStr for GroupingStrategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "logtype" | "bylogtype" => Ok(GroupingStrategy::ByLogType),
            "namespacename" | "bynamespacename" => Ok(GroupingStrategy::ByNamespaceName),
            "namespaceuuid" | "namespaceuid" | "bynamespaceuuid" => {
                Ok(GroupingStrategy::ByNamespaceUuid)
            }
            _ => Err(ParseError {
                kind: "grouping strategy",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_display() {
        for category in LogCategory::ALL {
            let parsed: LogCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_rejects_unknown() {
        let err = "metrics".parse::<LogCategory>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log category: metrics");
    }

    #[test]
    fn test_strategy_accepts_common_spellings() {
        assert_eq!(
            "logType".parse::<GroupingStrategy>().unwrap(),
            GroupingStrategy::ByLogType
        );
        assert_eq!(
            "namespace_name".parse::<GroupingStrategy>().unwrap(),
            GroupingStrategy::ByNamespaceName
        );
        assert_eq!(
            "namespaceUUID".parse::<GroupingStrategy>().unwrap(),
            GroupingStrategy::ByNamespaceUuid
        );
        assert!("byCluster".parse::<GroupingStrategy>().is_err());
    }

    #[test]
    fn test_only_namespace_strategies_are_namespaced() {
        assert!(!GroupingStrategy::ByLogType.is_namespaced());
        assert!(GroupingStrategy::ByNamespaceName.is_namespaced());
        assert!(GroupingStrategy::ByNamespaceUuid.is_namespaced());
    }
}
