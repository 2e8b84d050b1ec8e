use anyhow::{Context, Result};
use situational_data::{
    Clock, DataService, DomainCatalog, PgSettings, PgStore, ResilientProvider, StoreHandle, SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod config;
mod error;
mod logs_routes;
mod realtime;
mod routes;

use app::AppState;
use config::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "situational_gateway=debug,situational_data=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let catalog = match &config.fallback_dir {
        Some(dir) => DomainCatalog::with_overrides(dir, clock.now())
            .with_context(|| format!("failed to load fallback overrides from {}", dir.display()))?,
        None => DomainCatalog::builtin(clock.now()).context("failed to build fallback sets")?,
    };
    for (domain, records) in catalog.fallback_sizes() {
        tracing::info!("   Fallback {}: {} records", domain, records);
    }

    // The listener comes up straight away; until the background connect
    // attaches a store every domain serves its fallback set.
    let store = StoreHandle::empty();
    let connector = match &config.database {
        Some(settings) => Some(tokio::spawn(connect_store(settings.clone(), store.clone()))),
        None => {
            tracing::info!("   Database disabled, serving fallback data");
            None
        }
    };

    let provider = ResilientProvider::with_handle(store, clock).with_query_timeout(config.query_timeout);
    let state = AppState::new(DataService::new(provider, catalog));

    let app = app::router(state, Some(config.web_root.as_path()));

    let addr = config.listen_addr();
    tracing::info!("Situational Awareness gateway starting on {}", addr);
    tracing::info!("   Health: http://{}/api/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(connector) = connector {
        if connector.is_finished() {
            if let Ok(Some(pool)) = connector.await {
                pool.close().await;
                tracing::info!("Database pool closed");
            }
        } else {
            connector.abort();
        }
    }

    Ok(())
}

/// One connect attempt. On success the store is attached to `handle`; on
/// failure the gateway stays in offline mode until restart.
async fn connect_store(settings: PgSettings, handle: StoreHandle) -> Option<Arc<PgStore>> {
    tracing::info!(db = %settings.describe(), "connecting to database");
    match PgStore::connect(&settings).await {
        Ok(store) => {
            let store = Arc::new(store);
            handle.attach(store.clone());
            tracing::info!("Database pool configured and ready");
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, db = %settings.describe(), "database unavailable, serving fallback data");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections");
}
