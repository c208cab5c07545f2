pub mod config;

use anyhow::Result;
use dog_media::{FsChunkStore, MediaAdapter, MediaBackend, StoreGate};
use dog_media_axum::{MediaApp, MediaAxumState};
use tracing::{info, warn};

pub use config::{ConfigSnapshot, ServerConfig, Settings, ENV_PREFIX};

/// Build the app around a gate that is still closed.
///
/// Requests get `503` until [`open_store`] succeeds on the returned gate.
pub fn build(settings: &Settings) -> (MediaApp, StoreGate) {
    let gate = StoreGate::new();
    let state = MediaAxumState::new(gate.clone()).with_upload_field(&settings.upload_field);
    (MediaApp::new(state), gate)
}

/// Open the filesystem store and publish it through `gate`
pub async fn open_store(settings: &Settings, gate: &StoreGate) -> Result<()> {
    let config = settings.media_config();
    let store = FsChunkStore::open(&settings.store_root, config.chunk_size).await?;
    let adapter = MediaAdapter::new(MediaBackend::new(store), config);
    gate.open(adapter)?;

    info!(root = %settings.store_root.display(), "media store ready");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
    info!("shutdown signal received");
}
