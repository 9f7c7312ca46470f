pub mod advice;
pub mod hierarchy;
pub mod sales;

pub use advice::{AdvisorProvider, AdvisorSettings, ObservationKind, ObservationRecord};
pub use hierarchy::{CategoryGroup, Hierarchy, LeafCategory, ROOT_KEY};
pub use sales::{round1, weighted_mean, Level, Region, SalesRow, StoreCountSeries};
