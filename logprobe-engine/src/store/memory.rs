//! In-memory log store
//!
//! Behaves like CloudWatch (prefix-filtered group listing, stream names parsed
//! with the CloudWatch convention) over state the caller controls. Failures
//! can be queued to simulate an unreliable backend.

use async_trait::async_trait;
use logprobe_client::{ClientError, Result};
use logprobe_core::domain::{LogGroup, LogStream};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use super::{Backend, GroupLookup, LogStore};

#[derive(Debug, Default)]
struct State {
    /// Group name -> stream names
    groups: BTreeMap<String, Vec<String>>,
    failures: VecDeque<ClientError>,
    calls: usize,
}

/// [`LogStore`] backed by a map of group names to stream names
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    state: Mutex<State>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a group with the given streams
    pub fn with_group<S: Into<String>>(
        self,
        name: impl Into<String>,
        streams: impl IntoIterator<Item = S>,
    ) -> Self {
        self.put_group(name, streams);
        self
    }

    pub fn put_group<S: Into<String>>(
        &self,
        name: impl Into<String>,
        streams: impl IntoIterator<Item = S>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .groups
            .insert(name.into(), streams.into_iter().map(Into::into).collect());
    }

    /// Makes the next call fail with `error`
    pub fn push_failure(&self, error: ClientError) {
        self.state.lock().unwrap().failures.push_back(error);
    }

    /// Number of calls served so far, failed ones included
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn list_groups(&self, lookup: &GroupLookup) -> Result<Vec<LogGroup>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let scope = lookup.key.scope();
        Ok(state
            .groups
            .keys()
            .filter(|name| name.starts_with(&lookup.name))
            .map(|name| LogGroup {
                name: name.clone(),
                category: lookup.category,
                scope_key: scope.clone(),
            })
            .collect())
    }

    async fn list_streams(&self, group: &LogGroup, node: Option<&str>) -> Result<Vec<LogStream>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        let prefix = node.map(|node| format!("{}.", node));
        Ok(state
            .groups
            .get(&group.name)
            .map(|streams| {
                streams
                    .iter()
                    .filter(|name| prefix.as_ref().is_none_or(|p| name.starts_with(p.as_str())))
                    .map(|name| LogStream::from_cloudwatch_name(name.as_str()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
