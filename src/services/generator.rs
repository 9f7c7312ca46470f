use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::info;

use crate::date_utils::Calendar;
use crate::error::{AppError, AppResult};
use crate::models::{round1, Hierarchy, Level, Region, SalesRow, StoreCountSeries, ROOT_KEY};
use crate::services::aggregate::{
    composite_actual_at, composite_plan_at, sum_actual_at, sum_plan_at,
};
use crate::store::{RowStore, SalesData};

const PLAN_VOLATILITY: f64 = 0.4;
const WEEKEND_UPLIFT: f64 = 1.3;
const ACTUAL_NOISE: f64 = 0.1;
const SPIKE_PROBABILITY: f64 = 0.1;
const SPIKE_FACTOR: f64 = 0.2;

/// Plan and actual series for one leaf category in one concrete region.
#[derive(Debug, Clone)]
pub struct LeafSeries {
    pub region: Region,
    pub leaf_id: String,
    pub plan_values: Vec<f64>,
    pub actual_values: Vec<Option<f64>>,
}

pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Build a synthetic but self-consistent dataset over `calendar`.
pub fn generate<R: Rng>(
    calendar: Calendar,
    hierarchy: Hierarchy,
    rng: &mut R,
) -> AppResult<SalesData> {
    let days = calendar.len();

    let store_counts = vec![
        StoreCountSeries {
            region: Region::Sh,
            counts: (0..days).map(|_| rng.gen_range(78..=82)).collect(),
        },
        StoreCountSeries {
            region: Region::Js,
            counts: (0..days).map(|_| rng.gen_range(19..=21)).collect(),
        },
    ];

    let mut leaves = Vec::new();
    for region in Region::CONCRETE {
        for leaf in hierarchy.leaves() {
            let base = base_rate(region) + rng.gen_range(0.0..20.0);
            leaves.push(leaf_series(&calendar, region, &leaf.id, base, rng));
        }
    }

    let data = derive(calendar, hierarchy, leaves, store_counts)?;
    info!(
        rows = data.rows.len(),
        days = data.calendar.len(),
        "Generated sales dataset"
    );
    Ok(data)
}

fn base_rate(region: Region) -> f64 {
    match region {
        Region::Sh => 40.0,
        _ => 35.0,
    }
}

fn leaf_series<R: Rng>(
    calendar: &Calendar,
    region: Region,
    leaf_id: &str,
    base: f64,
    rng: &mut R,
) -> LeafSeries {
    let mut plan_values = Vec::with_capacity(calendar.len());
    let mut actual_values = Vec::with_capacity(calendar.len());

    for i in 0..calendar.len() {
        let half = PLAN_VOLATILITY / 2.0;
        let mut plan = base * (1.0 + rng.gen_range(-half..half));
        if calendar.is_weekend(i) {
            plan *= WEEKEND_UPLIFT;
        }
        let plan = round1(plan);
        plan_values.push(plan);

        if calendar.is_elapsed(i) {
            let mut actual = plan * (1.0 + rng.gen_range(-ACTUAL_NOISE..ACTUAL_NOISE));
            if rng.gen_bool(SPIKE_PROBABILITY) {
                actual *= if rng.gen_bool(0.5) {
                    1.0 + SPIKE_FACTOR
                } else {
                    1.0 - SPIKE_FACTOR
                };
            }
            actual_values.push(Some(round1(actual)));
        } else {
            actual_values.push(None);
        }
    }

    LeafSeries {
        region,
        leaf_id: leaf_id.to_string(),
        plan_values,
        actual_values,
    }
}

/// Derive every aggregate row from leaf series and store counts.
///
/// Groups and roots of the concrete regions are sums of their children. The
/// composite region is merged node by node from the two concrete regions,
/// including its groups and root, which are merged from the concrete groups
/// and roots rather than summed from composite leaves.
pub fn derive(
    calendar: Calendar,
    hierarchy: Hierarchy,
    leaves: Vec<LeafSeries>,
    store_counts: Vec<StoreCountSeries>,
) -> AppResult<SalesData> {
    let days = calendar.len();
    check_store_counts(&store_counts, days)?;

    let mut by_node: HashMap<(Region, String), SalesRow> = HashMap::new();

    for series in leaves {
        let group = hierarchy.group_of(&series.leaf_id).ok_or_else(|| {
            AppError::Validation(format!("Unknown leaf category '{}'", series.leaf_id))
        })?;
        if !series.region.is_concrete() {
            return Err(AppError::Validation(format!(
                "Leaf series for '{}' must belong to a concrete region",
                series.leaf_id
            )));
        }
        check_leaf_series(&calendar, &series)?;

        let leaf = hierarchy
            .leaf(&series.leaf_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown leaf '{}'", series.leaf_id)))?;
        let row = SalesRow {
            id: SalesRow::row_id(series.region, &leaf.id),
            key: leaf.id.clone(),
            name: leaf.name.clone(),
            parent_id: Some(SalesRow::row_id(series.region, &group.id)),
            level: Level::Leaf,
            region: series.region,
            plan_values: series.plan_values,
            actual_values: series.actual_values,
        };
        if by_node.insert((row.region, row.key.clone()), row).is_some() {
            return Err(AppError::Validation(format!(
                "Leaf '{}' supplied twice for region {}",
                series.leaf_id, series.region
            )));
        }
    }

    for region in Region::CONCRETE {
        let mut group_rows = Vec::with_capacity(hierarchy.groups.len());
        for group in &hierarchy.groups {
            let children = group
                .children
                .iter()
                .map(|leaf| {
                    by_node.get(&(region, leaf.id.clone())).ok_or_else(|| {
                        AppError::Validation(format!(
                            "Missing leaf series '{}' for region {}",
                            leaf.id, region
                        ))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;

            group_rows.push(SalesRow {
                id: SalesRow::row_id(region, &group.id),
                key: group.id.clone(),
                name: group.name.clone(),
                parent_id: Some(SalesRow::row_id(region, ROOT_KEY)),
                level: Level::Group,
                region,
                plan_values: (0..days).map(|i| sum_plan_at(children.iter().copied(), i)).collect(),
                actual_values: (0..days)
                    .map(|i| sum_actual_at(children.iter().copied(), i))
                    .collect(),
            });
        }

        let root = SalesRow {
            id: SalesRow::row_id(region, ROOT_KEY),
            key: ROOT_KEY.to_string(),
            name: region.label().to_string(),
            parent_id: None,
            level: Level::Root,
            region,
            plan_values: (0..days).map(|i| sum_plan_at(&group_rows, i)).collect(),
            actual_values: (0..days).map(|i| sum_actual_at(&group_rows, i)).collect(),
        };

        by_node.insert((region, ROOT_KEY.to_string()), root);
        for row in group_rows {
            by_node.insert((region, row.key.clone()), row);
        }
    }

    let counts_sh = &store_counts[position_of(&store_counts, Region::Sh)?].counts;
    let counts_js = &store_counts[position_of(&store_counts, Region::Js)?].counts;

    for key in hierarchy.node_keys() {
        let sh = by_node.get(&(Region::Sh, key.to_string()));
        let js = by_node.get(&(Region::Js, key.to_string()));
        let (Some(sh), Some(js)) = (sh, js) else {
            return Err(AppError::Internal(format!(
                "Node '{}' is missing from a concrete region",
                key
            )));
        };

        let parent_id = match sh.level {
            Level::Root => None,
            Level::Group => Some(SalesRow::row_id(Region::Total, ROOT_KEY)),
            Level::Leaf => hierarchy
                .group_of(key)
                .map(|g| SalesRow::row_id(Region::Total, &g.id)),
        };
        let name = if sh.level == Level::Root {
            Region::Total.label().to_string()
        } else {
            sh.name.clone()
        };

        let composite = SalesRow {
            id: SalesRow::row_id(Region::Total, key),
            key: key.to_string(),
            name,
            parent_id,
            level: sh.level,
            region: Region::Total,
            plan_values: (0..days)
                .map(|i| composite_plan_at(sh, js, counts_sh[i], counts_js[i], i))
                .collect(),
            actual_values: (0..days)
                .map(|i| composite_actual_at(sh, js, counts_sh[i], counts_js[i], i))
                .collect(),
        };
        by_node.insert((Region::Total, key.to_string()), composite);
    }

    let mut ordered = Vec::with_capacity(by_node.len());
    for region in Region::ALL {
        for key in hierarchy.node_keys() {
            if let Some(row) = by_node.remove(&(region, key.to_string())) {
                ordered.push(row);
            }
        }
    }

    let rows = RowStore::new(ordered)?;
    Ok(SalesData::new(calendar, hierarchy, rows, store_counts))
}

fn position_of(store_counts: &[StoreCountSeries], region: Region) -> AppResult<usize> {
    store_counts
        .iter()
        .position(|s| s.region == region)
        .ok_or_else(|| AppError::Validation(format!("Missing store counts for region {}", region)))
}

fn check_store_counts(store_counts: &[StoreCountSeries], days: usize) -> AppResult<()> {
    for series in store_counts {
        if !series.region.is_concrete() {
            return Err(AppError::Validation(
                "Store counts exist only for concrete regions".into(),
            ));
        }
        if series.counts.len() != days {
            return Err(AppError::Validation(format!(
                "Store counts for {} cover {} days, calendar has {}",
                series.region,
                series.counts.len(),
                days
            )));
        }
        if series.counts.iter().any(|c| *c < 0) {
            return Err(AppError::Validation(format!(
                "Store counts for {} must be non-negative",
                series.region
            )));
        }
    }
    for region in Region::CONCRETE {
        let supplied = store_counts.iter().filter(|s| s.region == region).count();
        if supplied != 1 {
            return Err(AppError::Validation(format!(
                "Expected one store count series for {}, got {}",
                region, supplied
            )));
        }
    }
    Ok(())
}

fn check_leaf_series(calendar: &Calendar, series: &LeafSeries) -> AppResult<()> {
    let days = calendar.len();
    if series.plan_values.len() != days || series.actual_values.len() != days {
        return Err(AppError::Validation(format!(
            "Series for {} '{}' must cover {} days",
            series.region, series.leaf_id, days
        )));
    }
    if series.plan_values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Validation(format!(
            "Plan values for {} '{}' must be finite",
            series.region, series.leaf_id
        )));
    }
    for (i, actual) in series.actual_values.iter().enumerate() {
        if calendar.is_elapsed(i) != actual.is_some() {
            return Err(AppError::Validation(format!(
                "Actual for {} '{}' on {} must be present exactly when the date has elapsed",
                series.region,
                series.leaf_id,
                calendar.date_string(i)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn calendar() -> Calendar {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        Calendar::build(d("2025-01-01"), d("2025-01-14"), d("2025-01-08")).unwrap()
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let a = generate(calendar(), Hierarchy::retail(), &mut seeded_rng(Some(7))).unwrap();
        let b = generate(calendar(), Hierarchy::retail(), &mut seeded_rng(Some(7))).unwrap();
        let rows_a: Vec<_> = a.rows.iter().cloned().collect();
        let rows_b: Vec<_> = b.rows.iter().cloned().collect();
        assert_eq!(rows_a, rows_b);
        assert_eq!(a.store_counts_snapshot(), b.store_counts_snapshot());
    }

    #[test]
    fn test_rows_ordered_composite_first_parent_before_children() {
        let data = generate(calendar(), Hierarchy::retail(), &mut seeded_rng(Some(1))).unwrap();
        assert_eq!(data.rows.len(), 3 * (1 + 2 + 13));
        assert_eq!(data.rows.at(0).id, "Total_total");
        assert_eq!(data.rows.at(1).id, "Total_fresh_dept");
        assert_eq!(data.rows.at(2).id, "Total_bakery");
        assert_eq!(data.rows.at(16).id, "SH_total");
        assert_eq!(data.rows.at(32).id, "JS_total");

        let mut seen = std::collections::HashSet::new();
        for row in data.rows.iter() {
            if let Some(parent) = &row.parent_id {
                assert!(seen.contains(parent), "{} listed before its parent", row.id);
            }
            seen.insert(row.id.clone());
        }
    }

    #[test]
    fn test_store_counts_in_band() {
        let data = generate(calendar(), Hierarchy::retail(), &mut seeded_rng(Some(3))).unwrap();
        let sh = data.counts(Region::Sh).unwrap();
        let js = data.counts(Region::Js).unwrap();
        assert!(sh.counts.iter().all(|c| (78..=82).contains(c)));
        assert!(js.counts.iter().all(|c| (19..=21).contains(c)));
    }

    #[test]
    fn test_missing_leaf_rejected() {
        let cal = calendar();
        let counts = Region::CONCRETE
            .iter()
            .map(|r| StoreCountSeries {
                region: *r,
                counts: vec![1; cal.len()],
            })
            .collect();
        let result = derive(cal, Hierarchy::retail(), Vec::new(), counts);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_future_actual_rejected() {
        let cal = calendar();
        let days = cal.len();
        let hierarchy = Hierarchy::retail();
        let mut leaves = Vec::new();
        for region in Region::CONCRETE {
            for leaf in hierarchy.leaves() {
                leaves.push(LeafSeries {
                    region,
                    leaf_id: leaf.id.clone(),
                    plan_values: vec![1.0; days],
                    actual_values: vec![Some(1.0); days],
                });
            }
        }
        let counts = Region::CONCRETE
            .iter()
            .map(|r| StoreCountSeries {
                region: *r,
                counts: vec![1; days],
            })
            .collect();
        assert!(derive(cal, hierarchy, leaves, counts).is_err());
    }
}
