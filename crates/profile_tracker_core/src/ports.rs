//! crates/profile_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete upstream API and document store.

use crate::domain::{ProfileSummary, WriteMode};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the
/// upstream GraphQL API or the document store).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The requested identity does not exist upstream. Not a systems fault.
    #[error("User '{0}' not found upstream")]
    NotFound(String),
    /// An external-dependency fault: transport failure, malformed or empty
    /// upstream payload, or store I/O failure.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to the upstream profile-statistics service.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Fetches the full summary for one username in a single upstream round
    /// trip. Pure query: no writes, no retries (retry policy, if any,
    /// belongs to the caller).
    async fn fetch_summary(&self, username: &str) -> PortResult<ProfileSummary>;
}

/// The persistent document collection that retains summaries across calls,
/// keyed by username.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Enumerates every document key in the summary collection. The store's
    /// key set is the source of truth for which usernames get bulk-refreshed;
    /// iteration order is store-defined and not guaranteed stable.
    async fn list_usernames(&self) -> PortResult<Vec<String>>;

    /// Writes the summary under key = `summary.username`, assigning a fresh
    /// server-side `last_updated` timestamp. `WriteMode` controls whether
    /// stored fields absent from the summary survive the write.
    async fn upsert(&self, summary: &ProfileSummary, mode: WriteMode) -> PortResult<()>;
}
