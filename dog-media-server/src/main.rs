use anyhow::Result;
use dog_media_server::{build, open_store, shutdown_signal, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let (app, gate) = build(&settings);

    // serve right away; handlers answer 503 until the store is open
    let store_settings = settings.clone();
    tokio::spawn(async move {
        if let Err(e) = open_store(&store_settings, &gate).await {
            tracing::error!(error = %e, root = %store_settings.store_root.display(), "media store failed to open");
        }
    });

    app.listen_with_shutdown(settings.addr(), shutdown_signal()).await
}
