use std::sync::Arc;

use crate::clients::{SerpApiClient, UpstreamSearch};
use crate::config::Config;
use crate::db::Store;
use crate::services::{SeaOrmSystemService, SearchService, SystemService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub upstream: Arc<dyn UpstreamSearch>,

    pub search_service: Arc<SearchService>,

    pub system_service: Arc<dyn SystemService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let client = SerpApiClient::new(config.upstream.clone())?;
        let configured = client.is_configured();
        if !configured {
            tracing::warn!(
                "No upstream API key configured; set {} or upstream.api_key",
                crate::config::API_KEY_ENV
            );
        }

        Ok(Self::with_upstream(config, store, Arc::new(client), configured))
    }

    /// Wires the services around an existing store and upstream.
    #[must_use]
    pub fn with_upstream(
        config: Config,
        store: Store,
        upstream: Arc<dyn UpstreamSearch>,
        upstream_configured: bool,
    ) -> Self {
        let store = store.with_cache_ttl(config.cache.ttl());

        let search_service = Arc::new(SearchService::new(
            store.clone(),
            upstream.clone(),
            config.upstream.max_results,
        ));

        let system_service: Arc<dyn SystemService> = Arc::new(SeaOrmSystemService::new(
            store.clone(),
            upstream_configured,
        ));

        Self {
            config: Arc::new(config),
            store,
            upstream,
            search_service,
            system_service,
        }
    }

    /// Stops outbound upstream traffic.
    pub fn shutdown(&self) {
        self.upstream.close();
    }
}
