//! Group classification
//!
//! Maps a request and a category to the group names that must exist, then
//! checks what the store lists against them. Name matching is exact; the one
//! exception is the application group under `ByLogType`, where every listed
//! group extending the expected name is a candidate and more than one
//! candidate is ambiguous.

use logprobe_client::ClientError;
use logprobe_core::domain::{
    GroupKey, GroupingStrategy, LogCategory, LogGroup, RequestError, VerificationRequest,
};
use tracing::{debug, warn};

use crate::store::{GroupLookup, LogStore};

/// What the store holds for the expected groups of one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every expected group exists
    Resolved(Vec<LogGroup>),
    /// Expected group names not visible yet, in request order
    Missing(Vec<String>),
    /// Several groups match a name that must be unique, sorted
    Ambiguous(Vec<String>),
}

/// Outcome for a single expected group
#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupOutcome {
    Found(LogGroup),
    Missing,
    Ambiguous(Vec<String>),
}

/// Resolves expected groups and classifies what a store lists
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupClassifier;

impl GroupClassifier {
    /// Keys of the groups that must exist for `category`
    ///
    /// Infrastructure and audit always have one group. Application depends on
    /// the grouping strategy: one group for the whole category, or one per
    /// namespace in request order.
    pub fn expected_keys(
        request: &VerificationRequest,
        category: LogCategory,
    ) -> Result<Vec<GroupKey>, RequestError> {
        if category != LogCategory::Application {
            return Ok(vec![GroupKey::Category(category)]);
        }

        match request.strategy {
            GroupingStrategy::ByLogType => Ok(vec![GroupKey::Category(category)]),
            GroupingStrategy::ByNamespaceName => Ok(request
                .namespaces
                .iter()
                .map(|ns| GroupKey::NamespaceName(ns.trim().to_string()))
                .collect()),
            GroupingStrategy::ByNamespaceUuid => Ok(request
                .namespace_uids()?
                .into_iter()
                .map(GroupKey::NamespaceUid)
                .collect()),
        }
    }

    /// One lookup per expected group
    pub fn lookups(
        request: &VerificationRequest,
        category: LogCategory,
    ) -> Result<Vec<GroupLookup>, RequestError> {
        Ok(Self::expected_keys(request, category)?
            .into_iter()
            .map(|key| GroupLookup::new(&request.group_prefix, category, key))
            .collect())
    }

    /// Queries `store` for every expected group of `category`
    ///
    /// Stops at the first ambiguous lookup. Backend errors are returned as-is;
    /// deciding whether they are worth retrying is up to the caller.
    pub async fn classify(
        store: &dyn LogStore,
        lookups: &[GroupLookup],
    ) -> Result<Classification, ClientError> {
        let mut found = Vec::with_capacity(lookups.len());
        let mut missing = Vec::new();

        for lookup in lookups {
            let listed = store.list_groups(lookup).await?;
            match resolve(lookup, listed) {
                LookupOutcome::Found(group) => found.push(group),
                LookupOutcome::Missing => missing.push(lookup.name.clone()),
                LookupOutcome::Ambiguous(names) => {
                    warn!("Multiple groups found for {}: {}", lookup.name, names.join(", "));
                    return Ok(Classification::Ambiguous(names));
                }
            }
        }

        if missing.is_empty() {
            Ok(Classification::Resolved(found))
        } else {
            debug!("{} of {} group(s) missing", missing.len(), lookups.len());
            Ok(Classification::Missing(missing))
        }
    }
}

/// Must every group extending the expected name be unique?
fn requires_unique_match(lookup: &GroupLookup) -> bool {
    matches!(lookup.key, GroupKey::Category(LogCategory::Application))
}

fn resolve(lookup: &GroupLookup, listed: Vec<LogGroup>) -> LookupOutcome {
    if requires_unique_match(lookup) {
        let mut names: Vec<String> = listed
            .iter()
            .filter(|group| group.name.starts_with(&lookup.name))
            .map(|group| group.name.clone())
            .collect();
        names.sort();
        names.dedup();
        if names.len() > 1 {
            return LookupOutcome::Ambiguous(names);
        }
    }

    listed
        .into_iter()
        .find(|group| group.name == lookup.name)
        .map_or(LookupOutcome::Missing, LookupOutcome::Found)
}
