use crate::cli::ServeArgs;
use crate::infra::{notification_dispatcher, seeded_repository, AppState};
use crate::routes::with_amendment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use gateway_dar::config::AppConfig;
use gateway_dar::error::AppError;
use gateway_dar::telemetry;
use gateway_dar::workflows::data_access::AmendmentService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(
        seeded_repository(Utc::now()).map_err(|err| AppError::Amendment(err.into()))?,
    );
    let notifications = Arc::new(notification_dispatcher(&config.notifications));
    let amendment_service = Arc::new(AmendmentService::new(
        repository,
        notifications,
        config.notifications.clone(),
    ));

    let app = with_amendment_routes(amendment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "data access request gateway ready");

    axum::serve(listener, app).await?;
    Ok(())
}
