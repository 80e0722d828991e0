use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use triage_core::constants::{DEFAULT_REST_ADDR, REST_ADDR_ENV};
use triage_core::{Collaborators, ConfigSources, CoreConfig, EmergencyDepartment};

/// Main entry point for the triage service
///
/// Resolves configuration once from the environment, builds the emergency department over
/// in-memory collaborators and serves the REST API.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_BED_COUNT`: number of emergency beds (default: 20)
/// - `TRIAGE_BED_FLOOR`: floor the beds are on (default: 1)
/// - `TRIAGE_DAILY_APPOINTMENT_MAX`: default per-provider daily quota (default: 20)
/// - `TRIAGE_EMERGENCY_PROVIDER_ID`: provider credited in clinical history entries
/// - `TRIAGE_CAPACITY_FILE`: optional YAML file with per-provider quotas
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("triage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_sources(ConfigSources::from_env())?);
    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    tracing::info!(
        beds = cfg.bed_count(),
        daily_max = cfg.default_daily_max(),
        "++ Starting triage REST on {}",
        rest_addr
    );

    let department = EmergencyDepartment::new(cfg, Collaborators::in_memory());
    let app = api_rest::router(AppState { department });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
