use crate::cli::ServeArgs;
use crate::infra::{seeded_repository, AppState, InMemoryNotificationOutbox};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use disaster_shield::config::AppConfig;
use disaster_shield::error::AppError;
use disaster_shield::telemetry;
use disaster_shield::workflows::matching::{InMemoryMatchingRepository, MatchingService};
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = if args.seed_sample_data {
        let repository = seeded_repository()?;
        info!("sample contractor pool loaded");
        repository
    } else {
        InMemoryMatchingRepository::default()
    };
    let outbox = Arc::new(InMemoryNotificationOutbox::default());
    let matching_service = Arc::new(MatchingService::new(
        Arc::new(repository),
        outbox,
        config.matching.clone(),
    ));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        invite_limit = config.matching.invite_limit,
        "disaster shield matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
