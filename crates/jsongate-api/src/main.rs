//! # jsongate-api — Binary Entry Point
//!
//! Compiles the route schemas and starts the Axum HTTP server.
//! Binds to `PORT` (default 3000).

use jsongate_api::state::{AppConfig, AppState};
use jsongate_api::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    telemetry::init(config.log_format);

    // A schema that does not compile is fatal: never start serving.
    let state = AppState::new(config.clone()).map_err(|e| {
        tracing::error!("schema definition failed: {e}");
        e
    })?;

    let app = jsongate_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("jsongate listening at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
