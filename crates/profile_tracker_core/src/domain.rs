//! crates/profile_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of the upstream API wire format and of the
//! document store's value encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The fixed set of difficulty tags the upstream service reports
/// accepted-submission counts under.
///
/// Serialized exactly as the upstream strings so the stored document keys
/// match what the API returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    All,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::All => "All",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// The most recent accepted submission on a user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub title: String,
    pub language: String,
    pub url: String,
    /// Converted from the upstream second-precision epoch value.
    pub submitted_at: DateTime<Utc>,
}

/// The normalized per-user record: one is built fresh on every fetch and is
/// never mutated in place.
///
/// The store's `last_updated` write timestamp is deliberately NOT a field
/// here: it is assigned server-side at persist time and is store-internal
/// bookkeeping, so callers never observe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Externally supplied identifier, case-sensitive. Also the store's
    /// document key.
    pub username: String,
    /// The profile's real-name field, falling back to the username when the
    /// profile has none.
    pub display_name: String,
    /// Accepted-submission counts per difficulty. A key is present only if
    /// the upstream returned data for it; absence means "no data", not zero.
    pub solved_counts: BTreeMap<Difficulty, u64>,
    /// `None` when the user has no accepted submissions.
    pub last_submission: Option<Submission>,
}

/// How an upsert treats fields already present in the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fully replace the existing document (single-user refresh).
    Replace,
    /// Preserve stored fields the new summary does not specify (bulk refresh).
    Merge,
}

/// The outcome of one bulk refresh over every known username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Number of usernames known to the store when the batch started.
    pub total_found: usize,
    /// Number of usernames successfully re-fetched and written.
    pub updated_count: usize,
    /// Usernames whose refresh failed, in iteration order. Always satisfies
    /// `updated_count + failed_usernames.len() == total_found`.
    pub failed_usernames: Vec<String>,
}
