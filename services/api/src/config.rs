//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. There is no ambient global state: the
//! loaded `Config` is passed by reference into the adapters that need it.

use base64::Engine;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
///
/// Any variant is fatal at process start; the service refuses to run in a
/// degraded mode with missing credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// The upstream GraphQL endpoint.
    pub upstream_url: String,
    /// Per-request bound on upstream and store calls. This keeps one stalled
    /// username from hanging an entire bulk refresh.
    pub request_timeout: Duration,
    /// Project id extracted from the decoded service-account credential.
    pub store_project_id: String,
    /// OAuth bearer token for the store's REST API, injected by the
    /// deployment platform.
    pub store_access_token: String,
    /// Document collection holding one summary per username.
    pub store_collection: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream Settings ---
        let upstream_url = std::env::var("UPSTREAM_GRAPHQL_URL")
            .unwrap_or_else(|_| "https://leetcode.com/graphql".to_string());

        let timeout_str =
            std::env::var("REQUEST_TIMEOUT_SECS").unwrap_or_else(|_| "10".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let request_timeout = Duration::from_secs(timeout_secs);

        // --- Load Store Credentials ---
        // The service-account credential arrives base64-encoded, the way the
        // deployment platform injects secrets. Only the project id is needed
        // here; the bearer token comes in separately.
        let service_account_b64 = std::env::var("FIREBASE_SERVICE_ACCOUNT_B64")
            .map_err(|_| ConfigError::MissingVar("FIREBASE_SERVICE_ACCOUNT_B64".to_string()))?;
        let store_project_id = decode_project_id(&service_account_b64)?;

        let store_access_token = std::env::var("STORE_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingVar("STORE_ACCESS_TOKEN".to_string()))?;

        let store_collection = std::env::var("STORE_COLLECTION")
            .unwrap_or_else(|_| "known-profile-summaries".to_string());

        Ok(Self {
            bind_address,
            log_level,
            upstream_url,
            request_timeout,
            store_project_id,
            store_access_token,
            store_collection,
        })
    }
}

/// Decodes the base64 service-account JSON and extracts its `project_id`.
fn decode_project_id(service_account_b64: &str) -> Result<String, ConfigError> {
    let var = "FIREBASE_SERVICE_ACCOUNT_B64";

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(service_account_b64.trim())
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;

    let service_account: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;

    service_account
        .get("project_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                var.to_string(),
                "decoded service account has no project_id".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_project_id_from_service_account() {
        let json = r#"{"type":"service_account","project_id":"demo-project"}"#;
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        assert_eq!(decode_project_id(&encoded).unwrap(), "demo-project");
    }

    #[test]
    fn rejects_credential_that_is_not_base64() {
        let err = decode_project_id("not base64!!").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue(var, _) if var.contains("SERVICE_ACCOUNT"))
        );
    }

    #[test]
    fn rejects_credential_without_project_id() {
        let json = r#"{"type":"service_account"}"#;
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        let err = decode_project_id(&encoded).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_, msg) if msg.contains("project_id")));
    }
}
