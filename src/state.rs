use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{SeaOrmAuthService, SecurityService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub security: Arc<SecurityService>,

    pub auth: Arc<SeaOrmAuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let security = Arc::new(SecurityService::new(store.clone(), config.security.clone()));
        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            (*security).clone(),
        ));

        Self {
            config,
            store,
            security,
            auth,
        }
    }
}
