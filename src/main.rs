use anyhow::Context;
use firstmover::api::{self, app_state::AppState};
use firstmover::config::loader::ConfigLoader;
use firstmover::models::curve::CurveDataset;
use firstmover::models::target::TargetRegistry;
use firstmover::observability::{
    AppMetrics, HealthCheckResult, ObservabilityState, create_observability_router, init_tracing,
};
use firstmover::services::{ProfileLookup, XProfileClient, create_analysis_service};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);
    ConfigLoader::validate(&config).context("invalid configuration")?;
    info!(app = %config.app_name, environment = %config.environment, "Starting FirstMover...");

    let registry = TargetRegistry::builtin();
    let curves = CurveDataset::load(config.curves.dataset_path.as_deref());
    info!(targets = registry.len(), curves = curves.len(), "Targets and adoption curves loaded");

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let profile_lookup: Option<Arc<dyn ProfileLookup>> = match &config.profile.bearer_token {
        Some(_) => Some(Arc::new(XProfileClient::new(
            http_client.clone(),
            &config.profile,
        ))),
        None => {
            warn!("No profile bearer token configured, profile lookups disabled");
            None
        }
    };

    let metrics = Arc::new(AppMetrics::default());
    let analysis_service = create_analysis_service(
        &config,
        Arc::new(registry.clone()),
        Arc::new(curves.clone()),
        profile_lookup,
        metrics.clone(),
    );
    info!("Analysis service initialized");

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION"),
        metrics.clone(),
    ));
    observability_state
        .set_health_check(HealthCheckResult {
            name: "adoption_curves".to_string(),
            healthy: !curves.is_empty(),
            message: format!("{} curves loaded", curves.len()),
        })
        .await;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::new(
        config,
        registry,
        curves,
        analysis_service,
        http_client,
        metrics,
    );

    let api_router = api::initialize_api(app_state).await?;
    let router = create_observability_router(observability_state).merge(api_router);
    info!("API router created with observability endpoints");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
