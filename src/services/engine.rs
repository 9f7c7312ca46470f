//! Point edits that keep every aggregate consistent.
//!
//! Both operations validate before writing anything. A missing parent,
//! sibling or composite counterpart found during propagation is an integrity
//! failure and surfaces as [`AppError::Internal`]; it is never read as zero.

use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{round1, Level, Region, ROOT_KEY};
use crate::services::aggregate::{composite_actual_at, composite_plan_at, sum_plan_at};
use crate::store::SalesData;

/// Set one plan cell and recompute its dependents at that date.
///
/// Edits to the composite region stop at the edited cell: there is no
/// defined way to split a blended value back into the two regions.
pub fn set_plan_value(
    data: &mut SalesData,
    row_id: &str,
    date_index: usize,
    value: f64,
) -> AppResult<()> {
    let pos = data
        .rows
        .position(row_id)
        .ok_or_else(|| AppError::NotFound(format!("Row '{}' not found", row_id)))?;
    data.calendar.check_index(date_index)?;
    let rounded = round1(value);
    if !rounded.is_finite() {
        return Err(AppError::Validation(format!(
            "Plan value must be a finite number, got {}",
            value
        )));
    }

    let (region, level, key, parent_id) = {
        let row = data.rows.at(pos);
        (row.region, row.level, row.key.clone(), row.parent_id.clone())
    };

    data.rows.row_mut(pos).plan_values[date_index] = rounded;
    debug!(row_id, date_index, value, "Plan value set");

    if !region.is_concrete() {
        return Ok(());
    }

    let mut group_key = None;
    if level == Level::Leaf {
        let parent_id = parent_id.ok_or_else(|| missing(&format!("parent of '{}'", row_id)))?;
        group_key = Some(recompute_group_plan(data, &parent_id, date_index)?);
    }

    recompute_root_plan(data, region, date_index)?;
    recompute_composite(data, &key, date_index, false)?;
    if let Some(group_key) = group_key {
        recompute_composite(data, &group_key, date_index, false)?;
    }
    if key != ROOT_KEY {
        recompute_composite(data, ROOT_KEY, date_index, false)?;
    }

    ensure_finite_at(data, date_index)
}

/// Set one region's store count for a date and re-weight every composite
/// row at that date.
pub fn set_store_count(
    data: &mut SalesData,
    region: Region,
    date_index: usize,
    count: i64,
) -> AppResult<()> {
    if !region.is_concrete() {
        return Err(AppError::Validation(format!(
            "Store counts can only be set for a concrete region, got {}",
            region
        )));
    }
    if count < 0 {
        return Err(AppError::Validation(format!(
            "Store count must be non-negative, got {}",
            count
        )));
    }
    data.calendar.check_index(date_index)?;

    data.counts_mut(region)?.counts[date_index] = count;
    debug!(%region, date_index, count, "Store count set");

    let hierarchy = Arc::clone(&data.hierarchy);
    for key in hierarchy.node_keys() {
        recompute_composite(data, key, date_index, true)?;
    }

    ensure_finite_at(data, date_index)
}

/// Reject an edit whose propagated aggregates left the `f64` range. The
/// working copy is discarded by the caller, so nothing is published.
fn ensure_finite_at(data: &SalesData, index: usize) -> AppResult<()> {
    let overflowed = data.rows.iter().find(|row| {
        !row.plan_values[index].is_finite()
            || row.actual_values[index].is_some_and(|v| !v.is_finite())
    });
    match overflowed {
        Some(row) => Err(AppError::Validation(format!(
            "Edit would push '{}' out of the numeric range on date index {}",
            row.id, index
        ))),
        None => Ok(()),
    }
}

/// Re-sum a concrete group's plan from its leaves. Returns the group's key.
fn recompute_group_plan(data: &mut SalesData, group_id: &str, index: usize) -> AppResult<String> {
    let group_pos = data
        .rows
        .position(group_id)
        .ok_or_else(|| missing(&format!("group row '{}'", group_id)))?;

    let mut children = data.rows.children(group_id).peekable();
    if children.peek().is_none() {
        return Err(missing(&format!("children of '{}'", group_id)));
    }
    let total = sum_plan_at(children, index);

    let group = data.rows.row_mut(group_pos);
    group.plan_values[index] = total;
    Ok(group.key.clone())
}

fn recompute_root_plan(data: &mut SalesData, region: Region, index: usize) -> AppResult<()> {
    let root_pos = data
        .rows
        .node_position(region, ROOT_KEY)
        .ok_or_else(|| missing(&format!("root row of {}", region)))?;

    let mut groups = data.rows.region_rows(region, Level::Group).peekable();
    if groups.peek().is_none() {
        return Err(missing(&format!("group rows of {}", region)));
    }
    let total = sum_plan_at(groups, index);

    data.rows.row_mut(root_pos).plan_values[index] = total;
    Ok(())
}

/// Re-weight the composite row for node `key` from both concrete regions.
/// With `with_actual` the actual is re-weighted too, or cleared when either
/// region has none.
fn recompute_composite(
    data: &mut SalesData,
    key: &str,
    index: usize,
    with_actual: bool,
) -> AppResult<()> {
    let count_sh = data.count_at(Region::Sh, index)?;
    let count_js = data.count_at(Region::Js, index)?;

    let sh = data
        .rows
        .find(Region::Sh, key)
        .ok_or_else(|| missing(&format!("SH row for '{}'", key)))?;
    let js = data
        .rows
        .find(Region::Js, key)
        .ok_or_else(|| missing(&format!("JS row for '{}'", key)))?;
    let plan = composite_plan_at(sh, js, count_sh, count_js, index);
    let actual = composite_actual_at(sh, js, count_sh, count_js, index);

    let total_pos = data
        .rows
        .node_position(Region::Total, key)
        .ok_or_else(|| missing(&format!("composite row for '{}'", key)))?;
    let total = data.rows.row_mut(total_pos);
    total.plan_values[index] = plan;
    if with_actual {
        total.actual_values[index] = actual;
    }
    Ok(())
}

fn missing(what: &str) -> AppError {
    AppError::Internal(format!("Hierarchy integrity violated: missing {}", what))
}

