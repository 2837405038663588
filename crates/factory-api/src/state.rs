//! Application state.

use std::sync::Arc;

use factory_store::{create_pool, DbConfig, Store};
use factory_worker::{GdriveOrigin, LocalOrigin, Origin, OriginBackend};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    pub origin: Arc<dyn Origin>,
}

impl AppState {
    /// Create new application state: opens the same sqlite store the
    /// workers write to and builds the origin backend used for draft
    /// preflight on submission.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = create_pool(DbConfig::sqlite(config.db_path.to_string_lossy())).await?;
        let store = Store::new(pool);

        let origin: Arc<dyn Origin> = match config.origin_backend {
            OriginBackend::Local => Arc::new(LocalOrigin::new(config.origin_local_root.clone())),
            OriginBackend::Gdrive => Arc::new(GdriveOrigin::new()),
        };

        Ok(Self { config, store, origin })
    }
}
