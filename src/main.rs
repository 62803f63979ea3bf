use anyhow::{Context, Result};
use object_gateway::{
    app,
    config::{AppConfig, StoreBackend},
    services::gateway::ObjectGateway,
    store,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = Arc::new(AppConfig::from_env_and_args()?);

    tracing::info!("Starting object-gateway with config: {:?}", cfg);

    // --- Ensure staging directory exists ---
    fs::create_dir_all(&cfg.staging_dir)
        .await
        .with_context(|| format!("creating staging directory {}", cfg.staging_dir.display()))?;

    // --- Initialize object store ---
    let store = store::from_config(&cfg)
        .await
        .with_context(|| format!("initializing {:?} store", cfg.backend))?;
    if cfg.backend == StoreBackend::Memory {
        tracing::warn!("memory backend selected; objects are lost on restart");
    }
    tracing::info!(
        "Using {} store for bucket {} (public URLs under https://{}.{}/)",
        store.name(),
        cfg.bucket,
        cfg.bucket,
        cfg.public_endpoint
    );

    // --- Build router ---
    let gateway = ObjectGateway::new(store, cfg.clone());
    let app = app(gateway);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve on Ctrl-C so in-flight uploads finish and release their staging files.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
