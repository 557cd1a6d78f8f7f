// # Scale Query API
//
// HTTP query service over the latest-value store.
//
// ## Endpoints
//
// - `GET /api/weight/latest`: the current reading, or 404 before the
//   first ingestion
// - `GET /api/data`: legacy dump of the audit trail as a JSON array
//
// Callers never see ingestion-side errors; until something is ingested
// the latest endpoint simply answers 404.
//
// ## CORS
//
// The dashboard frontend runs on its own origin, so the router carries a
// CORS layer restricted to the single configured origin (permissive when
// none is configured).

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use scale_core::audit::FileAuditSink;
use scale_core::reading::WeightReading;
use scale_core::store::LatestValueStore;

/// Shared state of the query service
#[derive(Clone)]
pub struct ApiContext {
    /// The single-slot cache written by the ingestion engine
    pub store: LatestValueStore,

    /// Audit trail for the legacy endpoint; `None` when auditing is off
    pub audit: Option<Arc<FileAuditSink>>,
}

/// Build the query router
///
/// `cors_origin` restricts cross-origin access to one origin; `None`
/// allows any.
pub fn router(ctx: ApiContext, cors_origin: Option<&str>) -> anyhow::Result<Router> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Ok(Router::new()
        .route("/api/weight/latest", get(latest_handler))
        .route("/api/data", get(data_handler))
        .layer(cors)
        .with_state(ctx))
}

/// Serve the router on the configured port until the process exits
pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Query API listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn latest_handler(State(ctx): State<ApiContext>) -> Response {
    match ctx.store.current().await {
        Some(reading) => Json(reading).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": "No weight reading available yet" })),
        )
            .into_response(),
    }
}

async fn data_handler(State(ctx): State<ApiContext>) -> Json<Vec<WeightReading>> {
    let entries = match &ctx.audit {
        Some(sink) => sink.read_entries().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read audit log: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    Json(entries)
}
