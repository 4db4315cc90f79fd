//! services/api/src/adapters/firestore.rs
//!
//! This module contains the document-store adapter, which is the concrete
//! implementation of the `SummaryStore` port from the `core` crate. It speaks
//! the Firestore REST v1 API over HTTP.

use async_trait::async_trait;
use chrono::SecondsFormat;
use profile_tracker_core::domain::{ProfileSummary, WriteMode};
use profile_tracker_core::ports::{PortError, PortResult, SummaryStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// The top-level document fields every summary write specifies. Used as the
/// update mask in merge mode so stored fields outside this set survive.
const SUMMARY_FIELDS: [&str; 4] = ["username", "display_name", "solved_counts", "last_submission"];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A store adapter that implements the `SummaryStore` port against a hosted
/// Firestore collection, one document per username.
#[derive(Clone)]
pub struct FirestoreAdapter {
    client: reqwest::Client,
    project_id: String,
    collection: String,
    access_token: String,
}

impl FirestoreAdapter {
    /// Creates a new `FirestoreAdapter`. The client carries the service-wide
    /// request timeout set at startup.
    pub fn new(
        client: reqwest::Client,
        project_id: String,
        collection: String,
        access_token: String,
    ) -> Self {
        Self {
            client,
            project_id,
            collection,
            access_token,
        }
    }

    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.project_id
        )
    }
}

//=========================================================================================
// Wire Schema
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<DocumentName>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DocumentName {
    name: String,
}

#[derive(Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: Document,
    /// Present only in merge mode: restricts the update to the listed field
    /// paths, preserving everything else in the stored document.
    #[serde(skip_serializing_if = "Option::is_none")]
    update_mask: Option<DocumentMask>,
    update_transforms: Vec<FieldTransform>,
}

#[derive(Serialize)]
struct Document {
    name: String,
    fields: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMask {
    field_paths: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: String,
    set_to_server_value: String,
}

//=========================================================================================
// Value Encoding
//=========================================================================================

/// Encodes a summary as Firestore typed values. Integers travel as decimal
/// strings and an absent last submission is an explicit null, per the REST
/// value format.
fn encode_summary(summary: &ProfileSummary) -> Map<String, Value> {
    let mut counts = Map::new();
    for (difficulty, count) in &summary.solved_counts {
        counts.insert(
            difficulty.as_str().to_string(),
            json!({ "integerValue": count.to_string() }),
        );
    }

    let last_submission = match &summary.last_submission {
        Some(sub) => json!({
            "mapValue": {
                "fields": {
                    "title": { "stringValue": &sub.title },
                    "language": { "stringValue": &sub.language },
                    "url": { "stringValue": &sub.url },
                    "submitted_at": {
                        "timestampValue":
                            sub.submitted_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                    }
                }
            }
        }),
        None => json!({ "nullValue": null }),
    };

    let mut fields = Map::new();
    fields.insert(
        "username".to_string(),
        json!({ "stringValue": &summary.username }),
    );
    fields.insert(
        "display_name".to_string(),
        json!({ "stringValue": &summary.display_name }),
    );
    fields.insert(
        "solved_counts".to_string(),
        json!({ "mapValue": { "fields": counts } }),
    );
    fields.insert("last_submission".to_string(), last_submission);
    fields
}

/// A document's key is the final segment of its full resource name.
fn username_from_document_name(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

//=========================================================================================
// `SummaryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryStore for FirestoreAdapter {
    async fn list_usernames(&self) -> PortResult<Vec<String>> {
        let url = format!("{}/{}/{}", BASE_URL, self.documents_root(), self.collection);

        let mut usernames = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            // Only the document names are needed, so mask out every field.
            let mut query = vec![
                ("pageSize".to_string(), "300".to_string()),
                ("mask.fieldPaths".to_string(), "__name__".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken".to_string(), token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await
                .map_err(|e| PortError::Upstream(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(PortError::Upstream(format!(
                    "store list failed with {}: {}",
                    status, body
                )));
            }

            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| PortError::Upstream(e.to_string()))?;

            usernames.extend(
                page.documents
                    .iter()
                    .map(|d| username_from_document_name(&d.name)),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(usernames)
    }

    async fn upsert(&self, summary: &ProfileSummary, mode: WriteMode) -> PortResult<()> {
        let document_name = format!(
            "{}/{}/{}",
            self.documents_root(),
            self.collection,
            summary.username
        );

        let update_mask = match mode {
            WriteMode::Replace => None,
            WriteMode::Merge => Some(DocumentMask {
                field_paths: SUMMARY_FIELDS.iter().map(|f| f.to_string()).collect(),
            }),
        };

        let request = CommitRequest {
            writes: vec![Write {
                update: Document {
                    name: document_name,
                    fields: encode_summary(summary),
                },
                update_mask,
                // The write timestamp is assigned server-side; the client
                // never fabricates it.
                update_transforms: vec![FieldTransform {
                    field_path: "last_updated".to_string(),
                    set_to_server_value: "REQUEST_TIME".to_string(),
                }],
            }],
        };

        let url = format!("{}/{}:commit", BASE_URL, self.documents_root());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Upstream(format!(
                "store write for '{}' failed with {}: {}",
                summary.username, status, body
            )));
        }

        Ok(())
    }
}

//=========================================================================================
// Tests
//=========================================================================================
