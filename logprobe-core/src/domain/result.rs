//! Verification result

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::LogCategory;

/// Per-category verdicts plus a human-readable reason for each failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub per_category: BTreeMap<LogCategory, bool>,
    pub diagnostics: Vec<String>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a passing category
    pub fn record_found(&mut self, category: LogCategory) {
        self.per_category.insert(category, true);
    }

    /// Records a failing category with its reason
    pub fn record_missing(&mut self, category: LogCategory, reason: impl AsRef<str>) {
        self.per_category.insert(category, false);
        self.diagnostics
            .push(format!("{}: {}", category, reason.as_ref()));
    }

    /// Whether `category` was requested and found
    pub fn is_found(&self, category: LogCategory) -> bool {
        self.per_category.get(&category).copied().unwrap_or(false)
    }

    /// Logical AND over every requested category; false when nothing was checked
    pub fn success(&self) -> bool {
        !self.per_category.is_empty() && self.per_category.values().all(|found| *found)
    }
}
