use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Level, Region, SalesRow};

/// Ordered, fixed set of hierarchy rows with id and node lookups.
///
/// Rows sit behind `Arc`s so cloning the store is shallow: a clone shares
/// every row until one side writes through [`RowStore::row_mut`], which
/// copies just that row.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Arc<SalesRow>>,
    by_id: Arc<HashMap<String, usize>>,
    by_node: Arc<HashMap<(Region, String), usize>>,
    children: Arc<HashMap<String, Vec<usize>>>,
}

impl RowStore {
    pub fn new(rows: Vec<SalesRow>) -> AppResult<Self> {
        let mut by_id = HashMap::with_capacity(rows.len());
        let mut by_node = HashMap::with_capacity(rows.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, row) in rows.iter().enumerate() {
            if by_id.insert(row.id.clone(), pos).is_some() {
                return Err(AppError::Validation(format!("Duplicate row id '{}'", row.id)));
            }
            if by_node.insert((row.region, row.key.clone()), pos).is_some() {
                return Err(AppError::Validation(format!(
                    "Duplicate node '{}' in region {}",
                    row.key, row.region
                )));
            }
            if let Some(parent) = &row.parent_id {
                children.entry(parent.clone()).or_default().push(pos);
            }
        }

        Ok(Self {
            rows: rows.into_iter().map(Arc::new).collect(),
            by_id: Arc::new(by_id),
            by_node: Arc::new(by_node),
            children: Arc::new(children),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SalesRow> {
        self.rows.iter().map(|r| r.as_ref())
    }

    pub fn get(&self, id: &str) -> Option<&SalesRow> {
        self.position(id).map(|pos| self.rows[pos].as_ref())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// The row for hierarchy node `key` within `region`.
    pub fn find(&self, region: Region, key: &str) -> Option<&SalesRow> {
        self.node_position(region, key)
            .map(|pos| self.rows[pos].as_ref())
    }

    pub fn node_position(&self, region: Region, key: &str) -> Option<usize> {
        self.by_node.get(&(region, key.to_string())).copied()
    }

    pub fn at(&self, pos: usize) -> &SalesRow {
        &self.rows[pos]
    }

    pub fn children(&self, parent_id: &str) -> impl Iterator<Item = &SalesRow> {
        self.children
            .get(parent_id)
            .into_iter()
            .flatten()
            .map(|pos| self.rows[*pos].as_ref())
    }

    pub fn region_rows(&self, region: Region, level: Level) -> impl Iterator<Item = &SalesRow> {
        self.iter()
            .filter(move |r| r.region == region && r.level == level)
    }

    /// Whether two stores hold the very same allocation for row `pos`.
    pub fn shares_row(&self, other: &RowStore, pos: usize) -> bool {
        match (self.rows.get(pos), other.rows.get(pos)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn row_mut(&mut self, pos: usize) -> &mut SalesRow {
        Arc::make_mut(&mut self.rows[pos])
    }
}

impl Serialize for RowStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
