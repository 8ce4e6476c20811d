use std::net::SocketAddr;

use hvac_portal_app::{router, telemetry};
use hvac_portal_storage::Database;
use hvac_portal_util::{load_env_file, AppConfig, Environment};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(config.environment)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", "database ready");

    let state = router::AppState::new(
        metrics,
        database,
        &config.session_secret,
        config.owner_open_id.clone(),
    )
    .with_secure_cookies(config.environment == Environment::Production);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
