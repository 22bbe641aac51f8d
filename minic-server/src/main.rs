use anyhow::{Context, Result};
use clap::Parser;
use minic_core::load_samples;
use minic_server::{AppState, ServerConfig, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let filter = if config.verbose {
        "minic_server=debug,minic_core=debug,tower_http=debug"
    } else {
        "minic_server=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let samples_root = config.samples_root();
    let samples = match load_samples(&samples_root) {
        Ok(samples) => samples,
        Err(err) => {
            warn!(error = %err, "serving without sample programs");
            Vec::new()
        }
    };
    info!(count = samples.len(), root = %samples_root.display(), "loaded samples");

    let state = AppState::new(config.compile_options(), samples, config.max_concurrent);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "minic server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
