//! FHIR terminology server - entry point.

use anyhow::Context;
use fhirsmith_server::{config::Config, logging, router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    logging::init_logging(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %config.listen_addr,
        endpoints = config.endpoints.len(),
        "starting fhirsmith-server"
    );

    let addr = config.listen_addr;
    let state = AppState::new(config)
        .await
        .context("failed to initialize application state")?;

    tokio::spawn(fhirsmith_server::background::run(state.clone()));

    let app = router::build(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind TCP listener on {addr}"))?;

    tracing::info!("fhirsmith-server listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server terminated unexpectedly");
        return Err(e.into());
    }

    tracing::info!("server shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let sigint = tokio::signal::ctrl_c();

    tokio::select! {
        _ = sigint => {
            tracing::info!("SIGINT received, starting graceful shutdown");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    tracing::info!("shutdown signal received, starting graceful shutdown");
}
