use crate::cli::ServeArgs;
use crate::infra::{build_assembler, AppState, SiteSeed};
use crate::routes::with_composition_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use site_composer::config::AppConfig;
use site_composer::error::AppError;
use site_composer::telemetry;
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
    if let Some(seed) = args.seed.take() {
        config.composition.seed_path = Some(seed);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let seed = SiteSeed::load(config.composition.seed_path.as_deref())?;
    let assembler = Arc::new(build_assembler(seed, config.composition.clone()));
    info!(
        catalog_entries = assembler.catalog().len(),
        default_locale = %assembler.default_locale(),
        "page assembler ready"
    );

    let app = with_composition_routes(assembler)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "site composer listening");

    axum::serve(listener, app).await?;
    Ok(())
}
