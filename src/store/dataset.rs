use serde::Serialize;
use std::sync::Arc;

use crate::date_utils::Calendar;
use crate::error::{AppError, AppResult};
use crate::models::{Hierarchy, Region, StoreCountSeries};
use crate::store::rows::RowStore;

/// The complete working set: rows plus the store counts that weight the
/// composite region. Cloning is shallow, which is what makes a published
/// snapshot immune to later edits.
#[derive(Debug, Clone, Serialize)]
pub struct SalesData {
    #[serde(skip)]
    pub calendar: Arc<Calendar>,
    #[serde(skip)]
    pub hierarchy: Arc<Hierarchy>,
    pub rows: RowStore,
    #[serde(serialize_with = "serialize_counts")]
    pub store_counts: Vec<Arc<StoreCountSeries>>,
}

impl SalesData {
    pub fn new(
        calendar: Calendar,
        hierarchy: Hierarchy,
        rows: RowStore,
        store_counts: Vec<StoreCountSeries>,
    ) -> Self {
        Self {
            calendar: Arc::new(calendar),
            hierarchy: Arc::new(hierarchy),
            rows,
            store_counts: store_counts.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn counts(&self, region: Region) -> AppResult<&StoreCountSeries> {
        self.store_counts
            .iter()
            .find(|s| s.region == region)
            .map(|s| s.as_ref())
            .ok_or_else(|| AppError::Validation(format!("No store counts for region {}", region)))
    }

    /// Store count of a concrete region on one date; 0 outside the calendar.
    pub fn count_at(&self, region: Region, index: usize) -> AppResult<i64> {
        Ok(self.counts(region)?.counts.get(index).copied().unwrap_or(0))
    }

    pub(crate) fn counts_mut(&mut self, region: Region) -> AppResult<&mut StoreCountSeries> {
        self.store_counts
            .iter_mut()
            .find(|s| s.region == region)
            .map(Arc::make_mut)
            .ok_or_else(|| AppError::Validation(format!("No store counts for region {}", region)))
    }

    pub fn store_counts_snapshot(&self) -> Vec<StoreCountSeries> {
        self.store_counts.iter().map(|s| s.as_ref().clone()).collect()
    }
}

fn serialize_counts<S: serde::Serializer>(
    counts: &[Arc<StoreCountSeries>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(counts.iter().map(|s| s.as_ref()))
}
