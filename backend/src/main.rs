//! Backend entry-point: loads settings, prepares persistence and serves the
//! REST API.

use actix_web::web;
use b2b_api::config::AppSettings;
use b2b_api::inbound::http::health::HealthState;
use b2b_api::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use b2b_api::server::{ServerConfig, create_server};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level()));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }

    let mut config = ServerConfig::from_settings(&settings)?;
    match settings.database_url() {
        Some(url) => {
            run_migrations(url).await?;
            let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.pool_max_size()))
                .await
                .wrap_err("create database pool")?;
            config = config.with_db_pool(pool);
        }
        None => warn!("no database URL configured; users are kept in memory"),
    }

    info!(
        mode = config.mode().as_str(),
        addr = %config.bind_addr(),
        "starting server"
    );
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("server terminated")
}
