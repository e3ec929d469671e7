use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::{metrics, request_id, security_headers, REQUEST_ID_HEADER};
use crate::AppState;

pub mod meetings;
pub mod translate;

/// Request bodies here are a transaction id or one chat message.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Build the full HTTP application: meeting routes, the routes the marketplace
/// web client already calls, health and metrics.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.marketplace_origin.clone());

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .route(
            "/meetings/:transaction_id",
            get(meetings::get_meeting).post(meetings::ensure_meeting),
        )
        .route("/meetings/", post(meetings::missing_transaction_id))
        .route("/meetings", post(meetings::missing_transaction_id))
        .route(
            "/api/zoom/create-meeting-for-transaction",
            post(meetings::create_meeting_for_transaction),
        )
        .route(
            "/api/zoom/meetings/:transaction_id",
            get(meetings::get_meeting),
        )
        .route("/api/translate", post(translate::translate))
        .fallback(fallback_404)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(metrics::track_http))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(security_headers))
}

/// The marketplace origin plus any local dev origin, with credentials.
fn cors_layer(marketplace_origin: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin = origin.to_str().unwrap_or("");
            origin == marketplace_origin
                || origin.starts_with("http://localhost:")
                || origin.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        // Cannot use AllowHeaders::any() together with credentials.
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}

async fn fallback_404() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
