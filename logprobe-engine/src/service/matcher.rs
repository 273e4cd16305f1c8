//! Stream matching
//!
//! Checks that the streams of a resolved group cover every emitter the
//! request expects. Streams are scanned once; identities were parsed when the
//! streams were read, so matching is set arithmetic.

use logprobe_core::domain::{
    AuditSubtype, LogCategory, LogStream, NodeSource, StreamIdentity, VerificationRequest,
};
use std::collections::BTreeSet;

/// Expected identities not found among the streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub missing: BTreeSet<StreamIdentity>,
}

impl MatchReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Missing identities as a comma-separated list, in identity order
    pub fn describe_missing(&self) -> String {
        self.missing
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMatcher;

impl StreamMatcher {
    /// Identities that must be present for `category`
    ///
    /// Application has none: the group existing is enough.
    pub fn expected(
        category: LogCategory,
        request: &VerificationRequest,
    ) -> BTreeSet<StreamIdentity> {
        match category {
            LogCategory::Application => BTreeSet::new(),
            LogCategory::Infrastructure => request
                .nodes
                .iter()
                .flat_map(|node| {
                    NodeSource::ALL
                        .into_iter()
                        .map(move |source| StreamIdentity::node(node.trim(), source))
                })
                .collect(),
            LogCategory::Audit => {
                let mut expected: BTreeSet<_> =
                    [AuditSubtype::K8s, AuditSubtype::Openshift, AuditSubtype::Linux]
                        .into_iter()
                        .map(StreamIdentity::Audit)
                        .collect();
                if request.ovn_audit_expected {
                    expected.insert(StreamIdentity::Audit(AuditSubtype::Ovn));
                }
                expected
            }
        }
    }

    /// Marks every expected identity seen in `streams`
    ///
    /// Streams without a recognised identity, or with one nobody expects,
    /// are ignored.
    pub fn match_streams<'a>(
        expected: &BTreeSet<StreamIdentity>,
        streams: impl IntoIterator<Item = &'a LogStream>,
    ) -> MatchReport {
        let mut missing = expected.clone();
        for stream in streams {
            if missing.is_empty() {
                break;
            }
            if let Some(identity) = &stream.identity {
                missing.remove(identity);
            }
        }
        MatchReport { missing }
    }
}
