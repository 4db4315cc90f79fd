//! crates/profile_tracker_core/src/coordinator.rs
//!
//! The Upsert Coordinator: drives the Summary Fetcher and the store through
//! their ports, in single-user and bulk-refresh modes.

use crate::domain::{BatchReport, ProfileSummary, WriteMode};
use crate::ports::{PortResult, StatsProvider, SummaryStore};
use std::sync::Arc;

//=========================================================================================
// The Coordinator
//=========================================================================================

/// Orchestrates fetch-then-write for one username or for every username the
/// store already knows. Holds its collaborators behind the core ports, so the
/// concrete upstream API and store are injected at startup.
pub struct UpsertCoordinator {
    provider: Arc<dyn StatsProvider>,
    store: Arc<dyn SummaryStore>,
}

impl UpsertCoordinator {
    /// Creates a new `UpsertCoordinator`.
    pub fn new(provider: Arc<dyn StatsProvider>, store: Arc<dyn SummaryStore>) -> Self {
        Self { provider, store }
    }

    /// Refreshes a single username: fetch, then fully replace the stored
    /// document. A fetch failure propagates unchanged and nothing is written,
    /// so the store never holds a partial record.
    ///
    /// The returned summary carries no write timestamp; that field is
    /// assigned by the store and stays store-internal.
    pub async fn refresh_one(&self, username: &str) -> PortResult<ProfileSummary> {
        let summary = self.provider.fetch_summary(username).await?;
        self.store.upsert(&summary, WriteMode::Replace).await?;
        Ok(summary)
    }

    /// Refreshes every username currently present in the store and reports
    /// the per-username outcome.
    ///
    /// Only the initial key enumeration can fail the batch as a whole. After
    /// that, each username is fetched and merge-written independently; a
    /// failure is recorded in the report and never aborts the loop or
    /// touches that user's stored document.
    ///
    /// One upstream round trip per username, sequentially, so callers must
    /// treat this as potentially slow. The per-call bound comes from the
    /// HTTP client timeout configured at startup.
    pub async fn refresh_all(&self) -> PortResult<BatchReport> {
        let usernames = self.store.list_usernames().await?;
        let total_found = usernames.len();

        let mut updated_count = 0usize;
        let mut failed_usernames = Vec::new();

        for username in usernames {
            let outcome = async {
                let summary = self.provider.fetch_summary(&username).await?;
                self.store.upsert(&summary, WriteMode::Merge).await
            }
            .await;

            match outcome {
                Ok(()) => updated_count += 1,
                Err(e) => {
                    tracing::warn!("Bulk refresh failed for '{}': {}", username, e);
                    failed_usernames.push(username);
                }
            }
        }

        Ok(BatchReport {
            total_found,
            updated_count,
            failed_usernames,
        })
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::ports::PortError;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// A provider backed by a fixed map of outcomes per username.
    struct FakeProvider {
        known: HashMap<String, ProfileSummary>,
        broken: Vec<String>,
    }

    #[async_trait]
    impl StatsProvider for FakeProvider {
        async fn fetch_summary(&self, username: &str) -> PortResult<ProfileSummary> {
            if self.broken.iter().any(|u| u == username) {
                return Err(PortError::Upstream("connection reset".to_string()));
            }
            self.known
                .get(username)
                .cloned()
                .ok_or_else(|| PortError::NotFound(username.to_string()))
        }
    }

    /// An in-memory store that records every write it receives. Writes for
    /// usernames in `reject` fail without touching the stored document.
    #[derive(Default)]
    struct FakeStore {
        docs: Mutex<BTreeMap<String, (ProfileSummary, WriteMode)>>,
        reject: Vec<String>,
    }

    #[async_trait]
    impl SummaryStore for FakeStore {
        async fn list_usernames(&self) -> PortResult<Vec<String>> {
            Ok(self.docs.lock().unwrap().keys().cloned().collect())
        }

        async fn upsert(&self, summary: &ProfileSummary, mode: WriteMode) -> PortResult<()> {
            if self.reject.iter().any(|u| u == &summary.username) {
                return Err(PortError::Upstream("store write denied".to_string()));
            }
            self.docs
                .lock()
                .unwrap()
                .insert(summary.username.clone(), (summary.clone(), mode));
            Ok(())
        }
    }

    fn summary(username: &str, easy: u64) -> ProfileSummary {
        let mut solved_counts = BTreeMap::new();
        solved_counts.insert(Difficulty::Easy, easy);
        ProfileSummary {
            username: username.to_string(),
            display_name: username.to_string(),
            solved_counts,
            last_submission: None,
        }
    }

    fn seeded_store(usernames: &[&str]) -> FakeStore {
        let store = FakeStore::default();
        for u in usernames {
            store
                .docs
                .lock()
                .unwrap()
                .insert(u.to_string(), (summary(u, 0), WriteMode::Replace));
        }
        store
    }

    #[tokio::test]
    async fn refresh_one_writes_with_replace_and_returns_summary() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([("alice".to_string(), summary("alice", 10))]),
            broken: vec![],
        });
        let store = Arc::new(FakeStore::default());
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let result = coordinator.refresh_one("alice").await.unwrap();
        assert_eq!(result.username, "alice");

        let docs = store.docs.lock().unwrap();
        let (stored, mode) = docs.get("alice").unwrap();
        assert_eq!(stored, &result);
        assert_eq!(*mode, WriteMode::Replace);
    }

    #[tokio::test]
    async fn refresh_one_propagates_not_found_without_writing() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::new(),
            broken: vec![],
        });
        let store = Arc::new(FakeStore::default());
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let err = coordinator.refresh_one("ghost").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(u) if u == "ghost"));
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_one_is_idempotent_for_identical_upstream_data() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([("alice".to_string(), summary("alice", 10))]),
            broken: vec![],
        });
        let store = Arc::new(FakeStore::default());
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let first = coordinator.refresh_one("alice").await.unwrap();
        let second = coordinator.refresh_one("alice").await.unwrap();
        assert_eq!(first, second);

        let docs = store.docs.lock().unwrap();
        assert_eq!(&docs.get("alice").unwrap().0, &second);
    }

    #[tokio::test]
    async fn refresh_all_isolates_failures_and_accounts_for_every_key() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([
                ("a".to_string(), summary("a", 1)),
                ("c".to_string(), summary("c", 3)),
            ]),
            broken: vec![],
        });
        let store = Arc::new(seeded_store(&["a", "b", "c"]));
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let report = coordinator.refresh_all().await.unwrap();
        assert_eq!(report.total_found, 3);
        assert_eq!(report.updated_count, 2);
        assert_eq!(report.failed_usernames, vec!["b".to_string()]);
        assert_eq!(
            report.updated_count + report.failed_usernames.len(),
            report.total_found
        );

        let docs = store.docs.lock().unwrap();
        // "a" and "c" were merge-written with fresh data; "b" is untouched.
        assert_eq!(docs.get("a").unwrap().0.solved_counts[&Difficulty::Easy], 1);
        assert_eq!(docs.get("a").unwrap().1, WriteMode::Merge);
        assert_eq!(docs.get("c").unwrap().0.solved_counts[&Difficulty::Easy], 3);
        assert_eq!(docs.get("b").unwrap().0.solved_counts[&Difficulty::Easy], 0);
        assert_eq!(docs.get("b").unwrap().1, WriteMode::Replace);
    }

    #[tokio::test]
    async fn refresh_all_records_upstream_errors_like_not_found() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([("a".to_string(), summary("a", 1))]),
            broken: vec!["b".to_string()],
        });
        let store = Arc::new(seeded_store(&["a", "b"]));
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let report = coordinator.refresh_all().await.unwrap();
        assert_eq!(report.total_found, 2);
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.failed_usernames, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn refresh_one_propagates_store_write_failure() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([("alice".to_string(), summary("alice", 10))]),
            broken: vec![],
        });
        let store = Arc::new(FakeStore {
            reject: vec!["alice".to_string()],
            ..FakeStore::default()
        });
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let err = coordinator.refresh_one("alice").await.unwrap_err();
        assert!(matches!(err, PortError::Upstream(_)));
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_all_records_store_write_failures_per_username() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::from([
                ("a".to_string(), summary("a", 1)),
                ("b".to_string(), summary("b", 2)),
                ("c".to_string(), summary("c", 3)),
            ]),
            broken: vec![],
        });
        let mut store = seeded_store(&["a", "b", "c"]);
        store.reject = vec!["b".to_string()];
        let store = Arc::new(store);
        let coordinator = UpsertCoordinator::new(provider, store.clone());

        let report = coordinator.refresh_all().await.unwrap();
        assert_eq!(report.total_found, 3);
        assert_eq!(report.updated_count, 2);
        assert_eq!(report.failed_usernames, vec!["b".to_string()]);

        let docs = store.docs.lock().unwrap();
        // "a" and "c" were merge-written; the refused write left "b" as seeded.
        assert_eq!(docs.get("a").unwrap().0.solved_counts[&Difficulty::Easy], 1);
        assert_eq!(docs.get("a").unwrap().1, WriteMode::Merge);
        assert_eq!(docs.get("c").unwrap().0.solved_counts[&Difficulty::Easy], 3);
        assert_eq!(docs.get("b").unwrap().0.solved_counts[&Difficulty::Easy], 0);
        assert_eq!(docs.get("b").unwrap().1, WriteMode::Replace);
    }

    #[tokio::test]
    async fn refresh_all_on_empty_store_returns_empty_report() {
        let provider = Arc::new(FakeProvider {
            known: HashMap::new(),
            broken: vec![],
        });
        let store = Arc::new(FakeStore::default());
        let coordinator = UpsertCoordinator::new(provider, store);

        let report = coordinator.refresh_all().await.unwrap();
        assert_eq!(report.total_found, 0);
        assert_eq!(report.updated_count, 0);
        assert!(report.failed_usernames.is_empty());
    }
}
