use std::sync::Arc;

use anyhow::Context;
use waypoint::{
    config::AppConfig,
    http::{self, AppState},
    store::{snapshot, Datastore, MemoryStore},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init().context("installing tracing subscriber")?;

    let config = AppConfig::from_env();
    let store = match &config.data_file {
        Some(path) => snapshot::load(path)
            .await
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);
    let data_file = config.data_file.clone();
    let addr = config.addr;

    let state = AppState::new(config, store.clone() as Arc<dyn Datastore>)?;
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = data_file {
        snapshot::save(&store, &path)
            .await
            .with_context(|| format!("saving snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), entities = store.len(), "snapshot saved");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "installing Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "installing SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
