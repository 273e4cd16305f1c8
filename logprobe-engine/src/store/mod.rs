//! Store layer
//!
//! A [`LogStore`] answers two questions about a remote log backend: which
//! groups exist for a lookup, and which streams a group holds. Stores are
//! stateless wrappers over the clients in `logprobe-client`; every call goes
//! to the backend, nothing is cached between poll attempts.
//!
//! All stores are trait-based so the engine can be tested against
//! [`InMemoryLogStore`].

mod cloudwatch;
mod elasticsearch;
mod loki;
mod memory;

pub use cloudwatch::CloudWatchStore;
pub use elasticsearch::ElasticsearchStore;
pub use loki::LokiStore;
pub use memory::InMemoryLogStore;

use async_trait::async_trait;
use logprobe_client::Result;
use logprobe_core::domain::{GroupKey, LogCategory, LogGroup, LogStream};
use std::fmt;
use std::str::FromStr;

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    CloudWatch,
    Elasticsearch,
    Loki,
    /// In-process store used in tests
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::CloudWatch => "cloudwatch",
            Backend::Elasticsearch => "elasticsearch",
            Backend::Loki => "loki",
            Backend::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloudwatch" | "cw" => Ok(Backend::CloudWatch),
            "elasticsearch" | "es" => Ok(Backend::Elasticsearch),
            "loki" | "lokistack" => Ok(Backend::Loki),
            other => Err(format!("unsupported backend: {}", other)),
        }
    }
}

/// One expected group to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLookup {
    /// Expected group name (`<prefix>.<segment>`)
    pub name: String,
    pub category: LogCategory,
    pub key: GroupKey,
}

impl GroupLookup {
    pub fn new(prefix: &str, category: LogCategory, key: GroupKey) -> Self {
        Self {
            name: key.group_name(prefix),
            category,
            key,
        }
    }
}

/// Query surface of a remote log store
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Which backend this store talks to
    fn backend(&self) -> Backend;

    /// Lists groups visible for `lookup`
    ///
    /// Backends with real named groups return every group whose name starts
    /// with `lookup.name`, so the caller can detect stale look-alikes.
    /// Backends without named groups return at most one group, named
    /// `lookup.name`, when data for the lookup exists. An empty list means
    /// "not visible yet", never an error.
    async fn list_groups(&self, lookup: &GroupLookup) -> Result<Vec<LogGroup>>;

    /// Lists the streams of `group` with their parsed identities
    ///
    /// `node` narrows the listing to streams emitted by that node; `None`
    /// lists the whole group.
    async fn list_streams(&self, group: &LogGroup, node: Option<&str>) -> Result<Vec<LogStream>>;
}
