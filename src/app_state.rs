use std::sync::Arc;

use crate::{config::Config, directory::Directory, store::DirectoryStore};

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize the store and its schema
        let store = DirectoryStore::new(&config.database.url, config.cache.capacity).await?;
        store.init().await?;
        let store = Arc::new(store);

        let directory = Directory::new(store, config.admin.clone());

        Ok(Self { directory, config })
    }
}
