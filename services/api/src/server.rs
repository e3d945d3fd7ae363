use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use aegis_dispatch::config::AppConfig;
use aegis_dispatch::dispatch::{DispatchService, MemoryDispatchStore};
use aegis_dispatch::error::AppError;
use aegis_dispatch::telemetry;

use crate::cli::ServeArgs;
use crate::infra::{seed_fleet, seed_incidents, AppState, InMemoryAlertPublisher};
use crate::routes::with_dispatch_routes;

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

    let store = Arc::new(MemoryDispatchStore::default());
    seed_fleet(&store);
    seed_incidents(&store);

    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let dispatch_service = Arc::new(DispatchService::with_config(
        store,
        alerts,
        config.engine.dispatch_config(),
    ));

    let app = with_dispatch_routes(dispatch_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "dispatch engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
