//! Verification request
//!
//! A request is built once per scenario from facts gathered elsewhere (node
//! list, namespace list) and stays immutable for one verification call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

use super::category::{GroupingStrategy, LogCategory};

/// Reasons a request cannot be verified at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("no log categories requested")]
    NoCategories,

    #[error("group prefix cannot be empty")]
    EmptyPrefix,

    #[error("grouping strategy {0} requires at least one namespace")]
    NoNamespaces(GroupingStrategy),

    #[error("namespace {0:?} is not a valid UID")]
    InvalidNamespaceUid(String),

    #[error("infrastructure verification requires at least one node")]
    NoNodes,
}

/// Description of the logs that should exist in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub categories: BTreeSet<LogCategory>,
    pub group_prefix: String,
    pub strategy: GroupingStrategy,
    /// Namespace names or UIDs, in request order; used when the strategy is namespaced
    pub namespaces: Vec<String>,
    pub nodes: Vec<String>,
    pub ovn_audit_expected: bool,
}

impl VerificationRequest {
    pub fn builder(group_prefix: impl Into<String>) -> VerificationRequestBuilder {
        VerificationRequestBuilder::new(group_prefix)
    }

    /// Checks that the request can be answered
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.categories.is_empty() {
            return Err(RequestError::NoCategories);
        }

        if self.group_prefix.trim().is_empty() {
            return Err(RequestError::EmptyPrefix);
        }

        if self.categories.contains(&LogCategory::Application) {
            if self.strategy.is_namespaced() && self.namespaces.is_empty() {
                return Err(RequestError::NoNamespaces(self.strategy));
            }
            if self.strategy == GroupingStrategy::ByNamespaceUuid {
                self.namespace_uids()?;
            }
        }

        if self.categories.contains(&LogCategory::Infrastructure) && self.nodes.is_empty() {
            return Err(RequestError::NoNodes);
        }

        Ok(())
    }

    /// Namespaces parsed as UIDs, in request order
    pub fn namespace_uids(&self) -> Result<Vec<Uuid>, RequestError> {
        self.namespaces
            .iter()
            .map(|ns| {
                Uuid::parse_str(ns.trim())
                    .map_err(|_| RequestError::InvalidNamespaceUid(ns.clone()))
            })
            .collect()
    }
}

/// Builder for [`VerificationRequest`]
#[derive(Debug, Clone)]
pub struct VerificationRequestBuilder {
    request: VerificationRequest,
}

impl VerificationRequestBuilder {
    pub fn new(group_prefix: impl Into<String>) -> Self {
        Self {
            request: VerificationRequest {
                categories: BTreeSet::new(),
                group_prefix: group_prefix.into(),
                strategy: GroupingStrategy::ByLogType,
                namespaces: Vec::new(),
                nodes: Vec::new(),
                ovn_audit_expected: false,
            },
        }
    }

    pub fn category(mut self, category: LogCategory) -> Self {
        self.request.categories.insert(category);
        self
    }

    pub fn categories(mut self, categories: impl IntoIterator<Item = LogCategory>) -> Self {
        self.request.categories.extend(categories);
        self
    }

    pub fn strategy(mut self, strategy: GroupingStrategy) -> Self {
        self.request.strategy = strategy;
        self
    }

    pub fn namespaces<S: Into<String>>(mut self, namespaces: impl IntoIterator<Item = S>) -> Self {
        self.request
            .namespaces
            .extend(namespaces.into_iter().map(Into::into));
        self
    }

    pub fn nodes<S: Into<String>>(mut self, nodes: impl IntoIterator<Item = S>) -> Self {
        self.request.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn ovn_audit_expected(mut self, expected: bool) -> Self {
        self.request.ovn_audit_expected = expected;
        self
    }

    pub fn build(self) -> VerificationRequest {
        self.request
    }
}
