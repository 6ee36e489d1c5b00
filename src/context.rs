/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    error::ApiResult,
    mailer::Mailer,
    store::{KvStore, MemoryStore, RedisStore},
    sync::SyncManager,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn KvStore>,
    pub accounts: Arc<AccountManager>,
    pub sync: Arc<SyncManager>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context backed by Redis
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let store: Arc<dyn KvStore> = Arc::new(RedisStore::connect(&config.store.redis_url).await?);
        store.ping().await?;

        Self::with_store(config, store)
    }

    /// Create a context over an in-memory store (tests, `--dev` runs)
    pub fn in_memory(config: ServerConfig) -> ApiResult<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    fn with_store(config: ServerConfig, store: Arc<dyn KvStore>) -> ApiResult<Self> {
        let config = Arc::new(config);
        let accounts = Arc::new(AccountManager::new(Arc::clone(&store), Arc::clone(&config)));
        let sync = Arc::new(SyncManager::new(Arc::clone(&store), Arc::clone(&config)));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            store,
            accounts,
            sync,
            mailer,
        })
    }

    /// Public base URL for links handed to clients
    pub fn public_url(&self) -> &str {
        &self.config.service.public_url
    }
}
