use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionRepository, UnconfiguredCollaborator};
use crate::routes::with_triage_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use disaster_triage::config::AppConfig;
use disaster_triage::error::AppError;
use disaster_triage::telemetry;
use disaster_triage::workflows::triage::{Rubric, TriageService};
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

    let repository = Arc::new(InMemorySessionRepository::default());
    let collaborator = Arc::new(UnconfiguredCollaborator);
    let rubric = Arc::new(Rubric::standard());
    let triage_service = Arc::new(
        TriageService::new(repository, collaborator, rubric)
            .with_default_sources(config.research.target_sources.clone()),
    );

    let app = with_triage_routes(triage_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sources = config.research.target_sources.len(),
        "disaster triage service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
