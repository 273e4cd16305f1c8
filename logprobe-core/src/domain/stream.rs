//! Log stream domain types
//!
//! Backends encode the emitter of a stream in its name or labels. Each stream
//! is parsed once into a typed [`StreamIdentity`] when it is read, and all
//! later comparisons work on the typed value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a node-level stream was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeSource {
    /// systemd journal of the node
    Journal,
    /// Container runtime log files under /var/log/pods or /var/log/containers
    ContainerRuntime,
}

impl NodeSource {
    pub const ALL: [NodeSource; 2] = [NodeSource::Journal, NodeSource::ContainerRuntime];
}

impl fmt::Display for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSource::Journal => f.write_str("journal"),
            NodeSource::ContainerRuntime => f.write_str("container"),
        }
    }
}

/// Kind of audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSubtype {
    K8s,
    Openshift,
    Linux,
    Ovn,
}

impl AuditSubtype {
    pub const ALL: [AuditSubtype; 4] = [
        AuditSubtype::K8s,
        AuditSubtype::Openshift,
        AuditSubtype::Linux,
        AuditSubtype::Ovn,
    ];

    /// Stream name suffix used by CloudWatch (`<node>.k8s-audit.log`)
    pub fn stream_suffix(&self) -> &'static str {
        match self {
            AuditSubtype::K8s => ".k8s-audit.log",
            AuditSubtype::Openshift => ".openshift-audit.log",
            AuditSubtype::Linux => ".linux-audit.log",
            AuditSubtype::Ovn => ".ovn-audit.log",
        }
    }
}

impl fmt::Display for AuditSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditSubtype::K8s => "k8s",
            AuditSubtype::Openshift => "openshift",
            AuditSubtype::Linux => "linux",
            AuditSubtype::Ovn => "ovn",
        };
        f.write_str(name)
    }
}

/// The emitter a stream belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StreamIdentity {
    Node { node: String, source: NodeSource },
    Audit(AuditSubtype),
}

const JOURNAL_SUFFIX: &str = ".journal.system";
const CONTAINER_MARKER: &str = ".kubernetes.var.log.";

impl StreamIdentity {
    pub fn node(node: impl Into<String>, source: NodeSource) -> Self {
        StreamIdentity::Node {
            node: node.into(),
            source,
        }
    }

    /// Parses a CloudWatch stream name
    ///
    /// Recognised forms:
    /// - `<node>.journal.system`
    /// - `<node>.kubernetes.var.log.pods...` and the legacy `...log.containers...`
    /// - `<node>.<subtype>-audit.log` for k8s, openshift, linux and ovn
    ///
    /// Node names may themselves contain dots. Returns `None` for anything else.
    pub fn parse_cloudwatch(name: &str) -> Option<Self> {
        if let Some(idx) = name.find(CONTAINER_MARKER) {
            let rest = &name[idx + CONTAINER_MARKER.len()..];
            let node = &name[..idx];
            if !node.is_empty() && (rest.starts_with("pods") || rest.starts_with("containers"))
            {
                return Some(Self::node(node, NodeSource::ContainerRuntime));
            }
            return None;
        }

        if let Some(node) = name.strip_suffix(JOURNAL_SUFFIX) {
            return (!node.is_empty()).then(|| Self::node(node, NodeSource::Journal));
        }

        AuditSubtype::ALL.into_iter().find_map(|subtype| {
            name.strip_suffix(subtype.stream_suffix())
                .filter(|node| !node.is_empty())
                .map(|_| StreamIdentity::Audit(subtype))
        })
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamIdentity::Node { node, source } => write!(f, "{} {}", node, source),
            StreamIdentity::Audit(subtype) => write!(f, "audit {}", subtype),
        }
    }
}

/// Finest-grained backend unit identifying a single emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStream {
    pub name: String,
    /// `None` when the name does not follow a known convention
    pub identity: Option<StreamIdentity>,
}

impl LogStream {
    /// Builds a stream from a CloudWatch stream name, parsing its identity
    pub fn from_cloudwatch_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let identity = StreamIdentity::parse_cloudwatch(&name);
        Self { name, identity }
    }

    /// Builds a stream whose identity was derived from structured fields
    pub fn with_identity(name: impl Into<String>, identity: StreamIdentity) -> Self {
        Self {
            name: name.into(),
            identity: Some(identity),
        }
    }
}
