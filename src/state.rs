use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::store::{SalesData, SalesStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SalesStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: SalesStore, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    pub fn snapshot(&self) -> AppResult<Arc<SalesData>> {
        self.store.snapshot()
    }
}
