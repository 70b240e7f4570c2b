use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use impact_effects::enrichment::sources::{FloraFaunaPayload, PopulationPayload, SeismicContext};
use impact_effects::enrichment::{
    impact_router, AreaQuery, EnrichmentSource, FloraFaunaQuery, ImpactEnrichmentService,
};
use serde_json::json;
use std::sync::Arc;

/// Impact endpoints plus the health, readiness and metrics routes.
pub(crate) fn with_impact_routes<P, S, F>(service: Arc<ImpactEnrichmentService<P, S, F>>) -> Router
where
    P: EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload> + 'static,
    S: EnrichmentSource<Request = AreaQuery, Payload = SeismicContext> + 'static,
    F: EnrichmentSource<Request = FloraFaunaQuery, Payload = FloraFaunaPayload> + 'static,
{
    impact_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
