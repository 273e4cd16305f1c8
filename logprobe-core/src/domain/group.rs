//! Log group domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::category::LogCategory;

/// What a log group is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    /// The group holds one whole category
    Category(LogCategory),
    /// The group holds one namespace, keyed by name
    NamespaceName(String),
    /// The group holds one namespace, keyed by UID
    NamespaceUid(Uuid),
}

impl GroupKey {
    /// Last dot-separated segment of the group name
    pub fn segment(&self) -> String {
        match self {
            GroupKey::Category(category) => category.as_str().to_string(),
            GroupKey::NamespaceName(name) => name.clone(),
            GroupKey::NamespaceUid(uid) => uid.to_string(),
        }
    }

    /// Namespace name or UID, when the key is namespace-scoped
    pub fn scope(&self) -> Option<String> {
        match self {
            GroupKey::Category(_) => None,
            GroupKey::NamespaceName(name) => Some(name.clone()),
            GroupKey::NamespaceUid(uid) => Some(uid.to_string()),
        }
    }

    /// Full group name under `prefix` (`<prefix>.<segment>`)
    pub fn group_name(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.segment())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Category(category) => write!(f, "{}", category),
            GroupKey::NamespaceName(name) => write!(f, "namespace {}", name),
            GroupKey::NamespaceUid(uid) => write!(f, "namespace uid {}", uid),
        }
    }
}

/// A backend-level named collection of log streams
///
/// Read-only projection of remote state; re-fetched on every poll attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    pub category: LogCategory,
    /// Namespace name or UID for namespace-scoped groups
    pub scope_key: Option<String>,
}

impl LogGroup {
    pub fn new(name: impl Into<String>, category: LogCategory) -> Self {
        Self {
            name: name.into(),
            category,
            scope_key: None,
        }
    }
}
