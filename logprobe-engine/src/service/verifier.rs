//! Verification aggregator
//!
//! Runs one bounded poll per requested category and folds the verdicts into a
//! [`VerificationResult`]. Categories are checked one after another, each with
//! its own retry budget; a failure in one never stops the others.

use logprobe_core::domain::{LogCategory, VerificationRequest, VerificationResult};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::error::{CheckError, VerifyError};
use crate::scheduler::{Attempt, CancellationToken, PollOutcome, poll_until};
use crate::service::classifier::{Classification, GroupClassifier};
use crate::service::matcher::{MatchReport, StreamMatcher};
use crate::store::{GroupLookup, LogStore};

/// What a pending attempt is still waiting for
#[derive(Debug)]
enum Waiting {
    Groups(Vec<String>),
    Streams(MatchReport),
    Backend(String),
}

impl fmt::Display for Waiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waiting::Groups(names) => write!(f, "waiting for groups: {}", names.join(", ")),
            Waiting::Streams(report) => {
                write!(f, "waiting for streams: {}", report.describe_missing())
            }
            Waiting::Backend(error) => {
                write!(f, "waiting for backend (backend unavailable: {})", error)
            }
        }
    }
}

/// Checks that requested log categories reached a store
pub struct Verifier {
    store: Arc<dyn LogStore>,
    interval: Duration,
    timeout: Duration,
}

impl Verifier {
    /// Creates a verifier with the default cadence (every 10s for up to 180s)
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Creates a verifier using the cadence of a validated `config`
    pub fn from_config(store: Arc<dyn LogStore>, config: &Config) -> Result<Self, VerifyError> {
        config
            .validate()
            .map_err(|e| VerifyError::Config(e.to_string()))?;
        Ok(Self::new(store).with_polling(config.poll_interval, config.poll_timeout))
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval;
        self.timeout = timeout;
        self
    }

    /// Verifies every category of `request`
    ///
    /// Returns an error only when the request itself is unusable; missing,
    /// ambiguous or failing categories are reported in the result.
    pub async fn verify_all(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerifyError> {
        self.verify_all_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Same as [`Verifier::verify_all`], abandoning pending checks once
    /// `cancel` fires
    ///
    /// Categories not started when the token fires are reported as cancelled.
    pub async fn verify_all_with_cancel(
        &self,
        request: &VerificationRequest,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerifyError> {
        request.validate()?;
        if self.interval.is_zero() {
            return Err(VerifyError::Config(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        // Resolve all lookups up front so a bad request fails before any polling
        let mut plan = Vec::with_capacity(request.categories.len());
        for category in &request.categories {
            plan.push((*category, GroupClassifier::lookups(request, *category)?));
        }

        info!(
            "Verifying {} categor{} on {} (prefix {})",
            plan.len(),
            if plan.len() == 1 { "y" } else { "ies" },
            self.store.backend(),
            request.group_prefix
        );

        let mut result = VerificationResult::new();
        for (category, lookups) in plan {
            match self.verify_category(request, category, &lookups, cancel).await {
                Ok(()) => {
                    info!("{} logs found", category);
                    result.record_found(category);
                }
                Err(reason) => {
                    warn!("{} logs not found: {}", category, reason);
                    result.record_missing(category, reason);
                }
            }
        }

        Ok(result)
    }

    /// Polls one category until it passes; the error is the diagnostic
    async fn verify_category(
        &self,
        request: &VerificationRequest,
        category: LogCategory,
        lookups: &[GroupLookup],
        cancel: &CancellationToken,
    ) -> Result<(), String> {
        info!(
            "Checking {} logs ({} group(s), timeout {:?})",
            category,
            lookups.len(),
            self.timeout
        );

        let outcome = poll_until(self.interval, self.timeout, cancel, move || {
            self.check_once(request, category, lookups)
        })
        .await;

        match outcome {
            Ok(PollOutcome::Ready(())) => Ok(()),
            Ok(PollOutcome::TimedOut { last_reason, .. }) => Err(match last_reason {
                Some(reason) => format!("timed out {}", reason),
                None => "timed out".to_string(),
            }),
            Ok(PollOutcome::Cancelled { last_reason, .. }) => Err(match last_reason {
                Some(reason) => format!("cancelled {}", reason),
                None => "cancelled before the first attempt".to_string(),
            }),
            Err(CheckError::Ambiguous(names)) => {
                Err(format!("ambiguous groups: {}", names.join(", ")))
            }
            Err(CheckError::Backend(e)) => Err(format!("backend error: {}", e)),
        }
    }

    /// One evaluation: classify groups, then match their streams
    async fn check_once(
        &self,
        request: &VerificationRequest,
        category: LogCategory,
        lookups: &[GroupLookup],
    ) -> Result<Attempt<()>, CheckError> {
        let store = self.store.as_ref();

        let groups = match GroupClassifier::classify(store, lookups).await {
            Ok(Classification::Resolved(groups)) => groups,
            Ok(Classification::Missing(names)) => {
                return Ok(Attempt::Pending(Waiting::Groups(names).to_string()));
            }
            Ok(Classification::Ambiguous(names)) => return Err(CheckError::Ambiguous(names)),
            Err(e) if e.is_transient() => return Ok(self.transient(e)),
            Err(e) => return Err(e.into()),
        };

        let expected = StreamMatcher::expected(category, request);
        if expected.is_empty() {
            return Ok(Attempt::Ready(()));
        }

        // Node streams are listed one node at a time
        let nodes: Vec<Option<&str>> = match category {
            LogCategory::Infrastructure => request
                .nodes
                .iter()
                .map(|node| node.trim())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(Some)
                .collect(),
            LogCategory::Application | LogCategory::Audit => vec![None],
        };

        let mut streams = Vec::new();
        for group in &groups {
            for node in &nodes {
                match self.store.list_streams(group, *node).await {
                    Ok(found) => streams.extend(found),
                    Err(e) if e.is_transient() => return Ok(self.transient(e)),
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let report = StreamMatcher::match_streams(&expected, &streams);
        if report.is_complete() {
            Ok(Attempt::Ready(()))
        } else {
            Ok(Attempt::Pending(Waiting::Streams(report).to_string()))
        }
    }

    fn transient(&self, error: logprobe_client::ClientError) -> Attempt<()> {
        warn!("{} unavailable, will retry: {}", self.store.backend(), error);
        Attempt::Pending(Waiting::Backend(error.to_string()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLogStore;
    use logprobe_client::ClientError;
    use logprobe_core::domain::GroupingStrategy;

    const EMPTY: [&str; 0] = [];
    const INTERVAL: Duration = Duration::from_millis(5);
    const TIMEOUT: Duration = Duration::from_millis(40);

    fn verifier(store: &Arc<InMemoryLogStore>) -> Verifier {
        let store: Arc<dyn LogStore> = store.clone();
        Verifier::new(store).with_polling(INTERVAL, TIMEOUT)
    }

    fn audit_streams() -> [&'static str; 3] {
        [
            "master-0.k8s-audit.log",
            "master-0.openshift-audit.log",
            "worker-0.linux-audit.log",
        ]
    }

    #[tokio::test]
    async fn test_no_group_is_bounded_false() {
        let store = Arc::new(InMemoryLogStore::new());
        let request = VerificationRequest::builder("p")
            .categories(LogCategory::ALL)
            .nodes(["worker-0"])
            .build();

        let started = std::time::Instant::now();
        let result = verifier(&store).verify_all(&request).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!result.success());
        for category in LogCategory::ALL {
            assert!(!result.is_found(category));
        }
        assert_eq!(
            result.diagnostics,
            vec![
                "application: timed out waiting for groups: p.application",
                "infrastructure: timed out waiting for groups: p.infrastructure",
                "audit: timed out waiting for groups: p.audit",
            ]
        );
    }

    #[tokio::test]
    async fn test_exact_group_naming() {
        let store = Arc::new(
            InMemoryLogStore::new().with_group("abc.infrastructure2", ["worker-0.journal.system"]),
        );
        let request = VerificationRequest::builder("abc")
            .category(LogCategory::Infrastructure)
            .nodes(["worker-0"])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(!result.is_found(LogCategory::Infrastructure));
        assert_eq!(
            result.diagnostics,
            vec!["infrastructure: timed out waiting for groups: abc.infrastructure"]
        );
    }

    #[tokio::test]
    async fn test_namespace_completeness() {
        let store = Arc::new(InMemoryLogStore::new().with_group("cluster1-xyz.ns-a", EMPTY));
        let request = VerificationRequest::builder("cluster1-xyz")
            .category(LogCategory::Application)
            .strategy(GroupingStrategy::ByNamespaceName)
            .namespaces(["ns-a", "ns-b"])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(!result.is_found(LogCategory::Application));
        assert_eq!(
            result.diagnostics,
            vec!["application: timed out waiting for groups: cluster1-xyz.ns-b"]
        );
    }

    #[tokio::test]
    async fn test_namespace_uids_all_present() {
        let uid_a = "3f0a7c2e-8d4b-4c1a-9e55-0b6f1d2a7c90";
        let uid_b = "9b1d2c3e-4f5a-4b6c-8d7e-0f1a2b3c4d5e";
        let store = Arc::new(
            InMemoryLogStore::new()
                .with_group(format!("p.{}", uid_a), EMPTY)
                .with_group(format!("p.{}", uid_b), EMPTY),
        );
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Application)
            .strategy(GroupingStrategy::ByNamespaceUuid)
            .namespaces([uid_a, uid_b])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(result.success());
        assert!(result.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_ambiguity_rejected_without_retry() {
        let store = Arc::new(
            InMemoryLogStore::new()
                .with_group("p.application", EMPTY)
                .with_group("p.application-stale", EMPTY),
        );
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Application)
            .build();

        let result = verifier(&store)
            .with_polling(INTERVAL, Duration::from_secs(30))
            .verify_all(&request)
            .await
            .unwrap();

        assert!(!result.success());
        assert_eq!(
            result.diagnostics,
            vec!["application: ambiguous groups: p.application, p.application-stale"]
        );
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let store = Arc::new(
            InMemoryLogStore::new()
                .with_group("p.application", EMPTY)
                .with_group("p.audit", ["master-0.k8s-audit.log"])
                .with_group("p.infrastructure", ["worker-0.journal.system"]),
        );
        let request = VerificationRequest::builder("p")
            .categories(LogCategory::ALL)
            .nodes(["worker-0"])
            .build();

        let verifier = verifier(&store);
        let first = verifier.verify_all(&request).await.unwrap();
        let second = verifier.verify_all(&request).await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_found(LogCategory::Application));
        assert!(!first.is_found(LogCategory::Infrastructure));
        assert!(!first.is_found(LogCategory::Audit));
    }

    #[tokio::test]
    async fn test_partial_node_coverage_fails_infrastructure() {
        let store = Arc::new(
            InMemoryLogStore::new()
                .with_group("cluster1-xyz.application", EMPTY)
                .with_group(
                    "cluster1-xyz.infrastructure",
                    [
                        "worker-0.journal.system",
                        "worker-1.journal.system",
                        "worker-2.journal.system",
                        "worker-0.kubernetes.var.log.pods.ns_a_1.c.0.log",
                        "worker-1.kubernetes.var.log.pods.ns_b_2.c.0.log",
                    ],
                ),
        );
        let request = VerificationRequest::builder("cluster1-xyz")
            .categories([LogCategory::Application, LogCategory::Infrastructure])
            .strategy(GroupingStrategy::ByLogType)
            .nodes(["worker-0", "worker-1", "worker-2"])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(result.is_found(LogCategory::Application));
        assert!(!result.is_found(LogCategory::Infrastructure));
        assert_eq!(
            result.diagnostics,
            vec!["infrastructure: timed out waiting for streams: worker-2 container"]
        );
    }

    #[tokio::test]
    async fn test_streams_listed_once_per_node() {
        let store = Arc::new(InMemoryLogStore::new().with_group(
            "p.infrastructure",
            [
                "worker-0.journal.system",
                "worker-0.kubernetes.var.log.pods.ns_a_1.c.0.log",
                "worker-1.journal.system",
                "worker-1.kubernetes.var.log.pods.ns_b_2.c.0.log",
            ],
        ));
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Infrastructure)
            .nodes(["worker-0", "worker-1", " worker-0 "])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(result.success());
        // one group listing, then one stream listing per distinct node
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_audit_without_ovn() {
        let store = Arc::new(InMemoryLogStore::new().with_group("p.audit", audit_streams()));
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Audit)
            .ovn_audit_expected(false)
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(result.is_found(LogCategory::Audit));
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_audit_with_ovn_expected() {
        let store = Arc::new(InMemoryLogStore::new().with_group("p.audit", audit_streams()));
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Audit)
            .ovn_audit_expected(true)
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(!result.success());
        assert_eq!(
            result.diagnostics,
            vec!["audit: timed out waiting for streams: audit ovn"]
        );
    }

    #[tokio::test]
    async fn test_late_arrival_is_found() {
        let store = Arc::new(InMemoryLogStore::new());
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Audit)
            .build();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.put_group("p.audit", audit_streams());
        });

        let result = verifier(&store)
            .with_polling(INTERVAL, Duration::from_secs(5))
            .verify_all(&request)
            .await
            .unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let store = Arc::new(InMemoryLogStore::new().with_group("p.application", EMPTY));
        store.push_failure(ClientError::api_error(503, "unavailable"));
        store.push_failure(ClientError::api_error(429, "slow down"));
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Application)
            .build();

        let result = verifier(&store)
            .with_polling(INTERVAL, Duration::from_secs(5))
            .verify_all(&request)
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_fails_only_its_category() {
        let store = Arc::new(
            InMemoryLogStore::new()
                .with_group("p.application", EMPTY)
                .with_group("p.audit", audit_streams()),
        );
        store.push_failure(ClientError::api_error(403, "forbidden"));
        let request = VerificationRequest::builder("p")
            .categories([LogCategory::Application, LogCategory::Audit])
            .build();

        let result = verifier(&store).verify_all(&request).await.unwrap();
        assert!(!result.is_found(LogCategory::Application));
        assert!(result.is_found(LogCategory::Audit));
        assert_eq!(
            result.diagnostics,
            vec!["application: backend error: API error (status 403): forbidden"]
        );
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_polling() {
        let store = Arc::new(InMemoryLogStore::new());
        let request = VerificationRequest::builder("p")
            .category(LogCategory::Application)
            .strategy(GroupingStrategy::ByNamespaceName)
            .build();

        let err = verifier(&store).verify_all(&request).await.unwrap_err();
        assert!(err.is_config());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_verification() {
        let store = Arc::new(InMemoryLogStore::new());
        let request = VerificationRequest::builder("p")
            .categories([LogCategory::Application, LogCategory::Audit])
            .build();

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = verifier(&store)
            .with_polling(Duration::from_secs(10), Duration::from_secs(60))
            .verify_all_with_cancel(&request, &token)
            .await
            .unwrap();

        assert!(!result.success());
        assert_eq!(
            result.diagnostics,
            vec![
                "application: cancelled waiting for groups: p.application",
                "audit: cancelled before the first attempt",
            ]
        );
    }
}
