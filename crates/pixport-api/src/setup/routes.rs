//! Route configuration and setup

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Json, Router,
};
use pixport_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let auth_state = Arc::new(AuthState::new(config.gallery_password()));
    if !auth_state.is_enabled() {
        tracing::warn!("GALLERY_PASSWORD not set; authentication is disabled");
    }

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/v0/health", get(handlers::health::health))
        .with_state(state.clone());

    // Protected routes (require the gallery password)
    let protected_routes = Router::new()
        .route(
            "/api/v0/images",
            post(handlers::upload::upload_images).get(handlers::gallery::list_images),
        )
        .route(
            "/api/v0/images/presign",
            post(handlers::presign::presign_images),
        )
        .route(
            "/api/v0/images/presign/complete",
            post(handlers::presign::complete_presigned),
        )
        .route(
            "/api/v0/images/download-url",
            get(handlers::gallery::download_url),
        )
        .route("/api/v0/quota", get(handlers::quota::quota_status))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // Body ceiling sized to the direct route's full batch
    let body_limit = config.max_request_body_bytes();

    let app = public_routes
        .merge(protected_routes)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::ApiDoc::openapi()) }),
        )
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// CORS layer from configured origins. `*` maps to Any (refused in
/// production by config validation).
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let origins = config.cors_origins();

    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
        })
        .collect::<Result<_, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any))
}
