use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::MutationCoordinator;
use crate::repo;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MutationCoordinator>,
}

impl AppState {
    pub async fn new(cfg: &Config) -> Result<Self> {
        let store = repo::connect(cfg).await?;
        Ok(Self::with_store(cfg, store))
    }

    pub fn with_store(cfg: &Config, store: Arc<dyn repo::HierarchyStore>) -> Self {
        let coordinator = Arc::new(MutationCoordinator::new(store, cfg.rules));
        Self { coordinator }
    }
}
