//! # Routegate Server
//!
//! Runs the gateway over HTTP with the great-circle reference engine
//! registered as the `driving` profile.
//!
//! Configuration comes from the environment:
//!
//! - `ROUTEGATE_ADDR` - listen address (default `127.0.0.1:5000`)
//! - `ROUTEGATE_MAX_QUERY_LENGTH` - longest accepted query in bytes
//! - `ROUTEGATE_SHUTDOWN_TIMEOUT_SECS` - connection drain timeout
//! - `ROUTEGATE_SPEED_MPS` - reference engine speed in meters per second
//! - `RUST_LOG` - log filter (default `routegate=info`)

use anyhow::{Context, Result};
use routegate_core::{
    CorsMiddleware, GreatCircleEngine, LoggingMiddleware, RouteService, Router, Server,
    ServerConfig,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize JSON tracing output
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("routegate=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}

/// Read and parse an environment variable, if set
fn env_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

fn load_config() -> Result<(ServerConfig, f64)> {
    let mut config = ServerConfig::default();
    if let Some(address) = env_var("ROUTEGATE_ADDR")? {
        config.address = address;
    }
    if let Some(max) = env_var("ROUTEGATE_MAX_QUERY_LENGTH")? {
        config.max_query_length = max;
    }
    if let Some(secs) = env_var("ROUTEGATE_SHUTDOWN_TIMEOUT_SECS")? {
        config.shutdown_timeout = Duration::from_secs(secs);
    }
    let speed = env_var("ROUTEGATE_SPEED_MPS")?.unwrap_or_else(|| GreatCircleEngine::default().speed_mps());
    anyhow::ensure!(speed > 0.0, "ROUTEGATE_SPEED_MPS must be positive, got {speed}");
    Ok((config, speed))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let (config, speed) = load_config()?;

    let mut router = Router::new()?;
    router.add_profile(
        "driving",
        RouteService::new(Arc::new(GreatCircleEngine::new(speed))),
    )?;

    let mut server = Server::with_config(router, config);
    server.add_middleware(LoggingMiddleware::new());
    server.add_middleware(CorsMiddleware::new());

    info!(
        version = routegate_core::VERSION,
        speed_mps = speed,
        "Starting routegate"
    );
    server.serve().await?;
    info!("Server stopped");
    Ok(())
}
