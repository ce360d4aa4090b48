use crate::infra::{ApiService, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use student_housing::listings::listing_router;

/// Listing API plus the health, readiness and metrics endpoints.
pub(crate) fn with_operational_routes(service: Arc<ApiService>) -> axum::Router {
    listing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::seed_locations;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use student_housing::listings::{
        InMemoryListingStore, ListingService, LogNotifier, ModerationConfig, ModerationEngine,
    };
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn service() -> Arc<ApiService> {
        let store = Arc::new(InMemoryListingStore::new());
        seed_locations(&store, None).expect("default seed applies");
        let engine = ModerationEngine::new(ModerationConfig::default()).expect("policy compiles");
        Arc::new(ListingService::new(store, Arc::new(LogNotifier), engine))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let pending = readiness_endpoint(Extension(state(false)))
            .await
            .into_response();
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = readiness_endpoint(Extension(state(true)))
            .await
            .into_response();
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_routes_are_mounted_next_to_operational_ones() {
        let app = with_operational_routes(service()).layer(Extension(state(true)));

        let health = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let cities = app
            .oneshot(
                Request::get("/api/v1/cities")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(cities.status(), StatusCode::OK);
        let body = axum::body::to_bytes(cities.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let cities: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(cities.as_array().map(Vec::len), Some(2));
    }
}
