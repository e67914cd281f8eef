use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use gateway_dar::workflows::data_access::{
    amendment_router, AmendmentService, ApplicationRepository, NotificationDispatcher,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_amendment_routes<R, N>(service: Arc<AmendmentService<R, N>>) -> axum::Router
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    amendment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{seeded_repository, LoggingNotificationDispatcher, DEMO_APPLICATION_ID};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use gateway_dar::config::NotificationConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flagged() {
        let app_state = state(false);
        let response = readiness_endpoint(Extension(app_state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        app_state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(app_state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn amendment_routes_are_mounted_with_health() {
        let repository = seeded_repository(Utc::now()).expect("seeded");
        let service = Arc::new(AmendmentService::new(
            Arc::new(repository),
            Arc::new(LoggingNotificationDispatcher::default()),
            NotificationConfig::default(),
        ));
        let app = with_amendment_routes(service).layer(Extension(state(true)));

        let response = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/data-access-request/{DEMO_APPLICATION_ID}"))
                    .header("x-user-id", "user-custodian")
                    .header("x-user-type", "custodian")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
