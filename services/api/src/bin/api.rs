//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FirestoreAdapter, LeetCodeAdapter},
    config::Config,
    error::ApiError,
    web::{refresh_handler, rest::ApiDoc, state::AppState},
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Router,
};
use profile_tracker_core::UpsertCoordinator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    // A configuration failure is fatal here, before anything binds or runs.
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build the Shared HTTP Client ---
    // One client for both adapters, with the fixed per-request timeout that
    // bounds every upstream and store call.
    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    // --- 3. Initialize Service Adapters ---
    let provider = Arc::new(LeetCodeAdapter::new(
        http_client.clone(),
        config.upstream_url.clone(),
    ));
    let store = Arc::new(FirestoreAdapter::new(
        http_client,
        config.store_project_id.clone(),
        config.store_collection.clone(),
        config.store_access_token.clone(),
    ));
    let coordinator = Arc::new(UpsertCoordinator::new(provider, store));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        coordinator,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/api/refresh", get(refresh_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
