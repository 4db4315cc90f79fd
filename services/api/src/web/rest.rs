//! services/api/src/web/rest.rs
//!
//! Contains the Axum handler for the refresh endpoint and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
};
use profile_tracker_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        refresh_handler,
    ),
    components(
        schemas(RefreshEnvelope)
    ),
    tags(
        (name = "Profile Tracker API", description = "API endpoints for fetching and persisting coding-profile summaries.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Query parameters for the refresh endpoint.
#[derive(Deserialize, IntoParams)]
pub struct RefreshParams {
    /// The profile to refresh (single-user mode).
    pub username: Option<String>,
    /// Set to `bulk` to refresh every username already known to the store.
    pub mode: Option<String>,
}

/// The JSON envelope every response is wrapped in. The `status` field, not
/// the HTTP status code, is the source of truth for callers.
#[derive(Serialize, ToSchema)]
pub struct RefreshEnvelope {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firestore_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RefreshEnvelope {
    fn success(message: String, firestore_path: Option<String>, data: serde_json::Value) -> Self {
        Self {
            status: "success".to_string(),
            message,
            firestore_path,
            data: Some(data),
            details: None,
        }
    }

    fn error(message: String, details: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            message,
            firestore_path: None,
            data: None,
            details,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Refresh one profile, or every known profile.
///
/// With `?username=<name>` the profile is fetched upstream and the stored
/// document fully replaced. With `?mode=bulk` every username in the store is
/// re-fetched and merge-written, and a batch report is returned. Errors come
/// back in the envelope with HTTP 200; check `status`.
#[utoipa::path(
    get,
    path = "/api/refresh",
    params(RefreshParams),
    responses(
        (status = 200, description = "Envelope with the refreshed summary, a batch report, or an error", body = RefreshEnvelope),
    )
)]
pub async fn refresh_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<RefreshParams>,
) -> Json<RefreshEnvelope> {
    let bulk = params.mode.as_deref() == Some("bulk");

    let envelope = if bulk {
        refresh_all(&app_state).await
    } else if let Some(username) = params.username.as_deref() {
        refresh_one(&app_state, username).await
    } else {
        RefreshEnvelope::error(
            "Please provide a 'username' query parameter or set mode=bulk.".to_string(),
            None,
        )
    };

    Json(envelope)
}

async fn refresh_one(app_state: &AppState, username: &str) -> RefreshEnvelope {
    match app_state.coordinator.refresh_one(username).await {
        Ok(summary) => {
            // `summary` carries no write timestamp; that field is assigned by
            // the store and stays store-internal.
            let data = serde_json::to_value(&summary).unwrap_or_default();
            RefreshEnvelope::success(
                format!("Successfully fetched and stored data for {}.", username),
                Some(format!("{}/{}", app_state.config.store_collection, username)),
                data,
            )
        }
        Err(e @ PortError::NotFound(_)) => RefreshEnvelope::error(e.to_string(), None),
        Err(PortError::Upstream(detail)) => {
            error!("Refresh failed for '{}': {}", username, detail);
            RefreshEnvelope::error(
                format!("Failed to refresh profile data for {}.", username),
                Some(detail),
            )
        }
    }
}

async fn refresh_all(app_state: &AppState) -> RefreshEnvelope {
    match app_state.coordinator.refresh_all().await {
        Ok(report) => {
            let message = format!(
                "Bulk refresh complete: {}/{} profiles updated.",
                report.updated_count, report.total_found
            );
            let data = serde_json::to_value(&report).unwrap_or_default();
            RefreshEnvelope::success(message, None, data)
        }
        Err(e) => {
            error!("Bulk refresh aborted: {}", e);
            RefreshEnvelope::error(
                "Bulk refresh failed before any profiles were processed.".to_string(),
                Some(e.to_string()),
            )
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use profile_tracker_core::domain::{ProfileSummary, WriteMode};
    use profile_tracker_core::ports::{PortResult, StatsProvider, SummaryStore};
    use profile_tracker_core::UpsertCoordinator;
    use std::collections::BTreeMap;

    struct OneUserProvider;

    #[async_trait]
    impl StatsProvider for OneUserProvider {
        async fn fetch_summary(&self, username: &str) -> PortResult<ProfileSummary> {
            if username != "alice" {
                return Err(PortError::NotFound(username.to_string()));
            }
            Ok(ProfileSummary {
                username: username.to_string(),
                display_name: "Alice Liddell".to_string(),
                solved_counts: BTreeMap::new(),
                last_submission: None,
            })
        }
    }

    struct NullStore;

    #[async_trait]
    impl SummaryStore for NullStore {
        async fn list_usernames(&self) -> PortResult<Vec<String>> {
            Ok(vec![])
        }
        async fn upsert(&self, _summary: &ProfileSummary, _mode: WriteMode) -> PortResult<()> {
            Ok(())
        }
    }

    fn test_state() -> Arc<AppState> {
        let coordinator = Arc::new(UpsertCoordinator::new(
            Arc::new(OneUserProvider),
            Arc::new(NullStore),
        ));
        let config = Arc::new(Config {
            bind_address: "127.0.0.1:3000".parse().unwrap(),
            log_level: tracing::Level::INFO,
            upstream_url: "http://localhost/graphql".to_string(),
            request_timeout: std::time::Duration::from_secs(10),
            store_project_id: "demo".to_string(),
            store_access_token: "token".to_string(),
            store_collection: "known-profile-summaries".to_string(),
        });
        Arc::new(AppState {
            coordinator,
            config,
        })
    }

    #[tokio::test]
    async fn missing_username_without_bulk_flag_is_an_error_envelope() {
        let Json(envelope) = refresh_handler(
            State(test_state()),
            Query(RefreshParams {
                username: None,
                mode: None,
            }),
        )
        .await;
        assert_eq!(envelope.status, "error");
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn single_mode_success_reports_the_document_path() {
        let Json(envelope) = refresh_handler(
            State(test_state()),
            Query(RefreshParams {
                username: Some("alice".to_string()),
                mode: None,
            }),
        )
        .await;
        assert_eq!(envelope.status, "success");
        assert_eq!(
            envelope.firestore_path.as_deref(),
            Some("known-profile-summaries/alice")
        );
        let data = envelope.data.unwrap();
        assert_eq!(data["username"], "alice");
        // The server write timestamp is store-internal and never surfaces.
        assert!(data.get("last_updated").is_none());
    }

    #[tokio::test]
    async fn unknown_user_yields_an_error_envelope_not_a_summary() {
        let Json(envelope) = refresh_handler(
            State(test_state()),
            Query(RefreshParams {
                username: Some("ghost".to_string()),
                mode: None,
            }),
        )
        .await;
        assert_eq!(envelope.status, "error");
        assert!(envelope.message.contains("ghost"));
    }

    #[tokio::test]
    async fn bulk_mode_returns_a_batch_report() {
        let Json(envelope) = refresh_handler(
            State(test_state()),
            Query(RefreshParams {
                username: None,
                mode: Some("bulk".to_string()),
            }),
        )
        .await;
        assert_eq!(envelope.status, "success");
        let data = envelope.data.unwrap();
        assert_eq!(data["total_found"], 0);
        assert_eq!(data["updated_count"], 0);
    }

    #[test]
    fn error_envelope_omits_empty_fields_when_serialized() {
        let envelope = RefreshEnvelope::error("boom".to_string(), None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("data").is_none());
        assert!(json.get("firestore_path").is_none());
        assert!(json.get("details").is_none());
    }
}
