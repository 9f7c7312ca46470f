pub mod dataset;
pub mod rows;

pub use dataset::SalesData;
pub use rows::RowStore;

use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

use crate::config::Config;
use crate::date_utils::Calendar;
use crate::error::{AppError, AppResult};
use crate::models::{Hierarchy, Region, StoreCountSeries};
use crate::services::{engine, generator};

/// Owner of the working set.
///
/// Readers clone the last published snapshot and never wait on an edit in
/// progress. Edits are serialized by `writer`, applied to a shallow working
/// copy and published only once every dependent row is consistent, so a
/// rejected edit leaves the published state untouched.
pub struct SalesStore {
    current: RwLock<Arc<SalesData>>,
    writer: Mutex<()>,
}

impl SalesStore {
    pub fn new(data: SalesData) -> Self {
        Self {
            current: RwLock::new(Arc::new(data)),
            writer: Mutex::new(()),
        }
    }

    /// Build the calendar, the retail hierarchy and a generated dataset.
    pub fn initialize(config: &Config) -> AppResult<Self> {
        let calendar = Calendar::build(config.window_start, config.window_end, config.today)?;
        let mut rng = generator::seeded_rng(config.seed);
        let data = generator::generate(calendar, Hierarchy::retail(), &mut rng)?;
        info!(
            from = %config.window_start,
            to = %config.window_end,
            today = %config.today,
            "Sales store initialized"
        );
        Ok(Self::new(data))
    }

    pub fn snapshot(&self) -> AppResult<Arc<SalesData>> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| AppError::Internal("Sales store lock poisoned".into()))
    }

    pub fn rows(&self) -> AppResult<RowStore> {
        Ok(self.snapshot()?.rows.clone())
    }

    pub fn store_counts(&self) -> AppResult<Vec<StoreCountSeries>> {
        Ok(self.snapshot()?.store_counts_snapshot())
    }

    pub fn set_plan_value(
        &self,
        row_id: &str,
        date_index: usize,
        value: f64,
    ) -> AppResult<Arc<SalesData>> {
        self.mutate(|data| engine::set_plan_value(data, row_id, date_index, value))
    }

    pub fn set_store_count(
        &self,
        region: Region,
        date_index: usize,
        count: i64,
    ) -> AppResult<Arc<SalesData>> {
        self.mutate(|data| engine::set_store_count(data, region, date_index, count))
    }

    fn mutate<F>(&self, apply: F) -> AppResult<Arc<SalesData>>
    where
        F: FnOnce(&mut SalesData) -> AppResult<()>,
    {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| AppError::Internal("Sales store writer lock poisoned".into()))?;

        let mut working = SalesData::clone(&*self.snapshot()?);
        apply(&mut working)?;

        let published = Arc::new(working);
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("Sales store lock poisoned".into()))?;
        *current = Arc::clone(&published);
        Ok(published)
    }
}
