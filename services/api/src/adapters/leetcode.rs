//! services/api/src/adapters/leetcode.rs
//!
//! This module contains the adapter for the upstream LeetCode GraphQL API.
//! It implements the `StatsProvider` port from the `core` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use profile_tracker_core::domain::{Difficulty, ProfileSummary, Submission};
use profile_tracker_core::ports::{PortError, PortResult, StatsProvider};
use reqwest::header;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One aggregated query: profile display name, per-difficulty accepted
/// counts, and the single most recent accepted submission, in one round trip.
const SUMMARY_QUERY: &str = r#"
query userPublicProfileAndRecentSubs($username: String!) {
  matchedUser(username: $username) {
    username
    profile {
      realName
    }
    submitStatsGlobal {
      acSubmissionNum {
        difficulty
        count
      }
    }
  }
  recentAcSubmissionList(username: $username, limit: 1) {
    title
    titleSlug
    timestamp
    lang
  }
}
"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StatsProvider` against the LeetCode GraphQL
/// endpoint.
#[derive(Clone)]
pub struct LeetCodeAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl LeetCodeAdapter {
    /// Creates a new `LeetCodeAdapter`. The client is expected to carry the
    /// service-wide request timeout set at startup.
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

//=========================================================================================
// Wire Schema (validated at the deserialization boundary)
//=========================================================================================

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Variables<'a>,
}

#[derive(Serialize)]
struct Variables<'a> {
    username: &'a str,
}

#[derive(Deserialize)]
struct GraphQlEnvelope {
    data: Option<SummaryData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    matched_user: Option<MatchedUser>,
    #[serde(default)]
    recent_ac_submission_list: Vec<RecentSubmission>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    username: String,
    profile: Option<Profile>,
    submit_stats_global: Option<SubmitStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    real_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    #[serde(default)]
    ac_submission_num: Vec<AcCount>,
}

#[derive(Deserialize)]
struct AcCount {
    difficulty: Difficulty,
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentSubmission {
    title: String,
    title_slug: String,
    #[serde(deserialize_with = "epoch_seconds")]
    timestamp: i64,
    lang: String,
}

/// The upstream reports the submission timestamp as a decimal string of
/// epoch seconds; accept a bare integer as well.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Str(s) => s.parse::<i64>().map_err(serde::de::Error::custom),
    }
}

//=========================================================================================
// `StatsProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl StatsProvider for LeetCodeAdapter {
    /// Fetches and normalizes the full summary for `username` in a single
    /// upstream round trip.
    async fn fetch_summary(&self, username: &str) -> PortResult<ProfileSummary> {
        let request = GraphQlRequest {
            query: SUMMARY_QUERY,
            variables: Variables { username },
        };

        // The upstream rejects requests without a same-origin Referer.
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::REFERER, "https://leetcode.com")
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        let envelope: GraphQlEnvelope = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        summarize(username, envelope)
    }
}

//=========================================================================================
// Normalization
//=========================================================================================

/// Builds the canonical `ProfileSummary` from a decoded upstream response.
/// Pure function so the edge cases are testable without a network.
fn summarize(username: &str, envelope: GraphQlEnvelope) -> PortResult<ProfileSummary> {
    let data = envelope.data.ok_or_else(|| {
        let detail = envelope
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "response carried no data".to_string());
        PortError::Upstream(format!("Upstream returned no data: {}", detail))
    })?;

    let matched = data
        .matched_user
        .ok_or_else(|| PortError::NotFound(username.to_string()))?;

    let display_name = matched
        .profile
        .and_then(|p| p.real_name)
        .filter(|name| !name.is_empty())
        .unwrap_or(matched.username);

    // Duplicate difficulty entries are not expected upstream, but a repeat
    // simply overwrites the earlier count (last wins).
    let mut solved_counts = BTreeMap::new();
    for entry in matched
        .submit_stats_global
        .map(|s| s.ac_submission_num)
        .unwrap_or_default()
    {
        solved_counts.insert(entry.difficulty, entry.count);
    }

    let last_submission = data
        .recent_ac_submission_list
        .into_iter()
        .next()
        .map(|sub| {
            let submitted_at = DateTime::<Utc>::from_timestamp(sub.timestamp, 0).ok_or_else(
                || PortError::Upstream(format!("submission timestamp out of range: {}", sub.timestamp)),
            )?;
            Ok(Submission {
                title: sub.title,
                language: sub.lang,
                url: format!("https://leetcode.com/problems/{}/", sub.title_slug),
                submitted_at,
            })
        })
        .transpose()?;

    Ok(ProfileSummary {
        username: username.to_string(),
        display_name,
        solved_counts,
        last_submission,
    })
}

//=========================================================================================
// Tests
//=========================================================================================
