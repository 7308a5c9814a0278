use std::sync::Arc;

use axum::Router;
use configs::{AppConfig, StoreBackend, StoreConfig};
use tracing::{info, warn};

use service::books::BookManager;
use service::storage::{JsonFileStore, MemoryStore, SeaOrmStore, Store};

use crate::errors::StartupError;
use crate::resource::ResourceRouter;
use crate::routes;

/// Open the backend selected by `store.backend`.
pub async fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn Store>, StartupError> {
    cfg.validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let store: Arc<dyn Store> = match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(JsonFileStore::open(&cfg.path).await?),
        StoreBackend::Postgres => Arc::new(SeaOrmStore::connect(cfg).await?),
    };
    info!(backend = ?cfg.backend, "store ready");
    Ok(store)
}

/// Every collection the server exposes, bound to `store`.
pub fn mount_resources(store: Arc<dyn Store>) -> ResourceRouter {
    let mut resources = ResourceRouter::new();
    resources.bind(Arc::new(BookManager::new("books", store)));
    resources
}

/// The complete application for `cfg`, backed by `store`.
pub fn build_app(cfg: &AppConfig, store: Arc<dyn Store>) -> Router {
    routes::build_router(mount_resources(store), &cfg.server.api_prefix)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: open the store, serve until Ctrl+C, then close the store.
pub async fn run(mut cfg: AppConfig) -> anyhow::Result<()> {
    cfg.normalize_and_validate()
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    let store = build_store(&cfg.store).await?;
    let app = build_app(&cfg, Arc::clone(&store));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, prefix = %cfg.server.api_prefix, "starting resource server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("resource server stopped");
    Ok(())
}
