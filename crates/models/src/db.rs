use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use configs::StoreConfig;
use migration::{Migrator, MigratorTrait};

use crate::errors::ModelError;

/// Connect with pool settings from the `[store]` section and bring the schema up to date.
pub async fn connect_with_config(cfg: &StoreConfig) -> Result<DatabaseConnection, ModelError> {
    let mut opts = ConnectOptions::new(cfg.url.clone());
    opts.max_connections(cfg.max_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .sqlx_logging(cfg.sqlx_logging);
    let db = Database::connect(opts).await?;
    Migrator::up(&db, None).await?;
    info!(max_connections = cfg.max_connections, "document store connected and migrated");
    Ok(db)
}
