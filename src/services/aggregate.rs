//! Point-wise aggregation rules shared by the generator and the update engine.
//!
//! Category closure: a parent's plan is the sum of its children's plans; its
//! actual is the sum only when every child has one. Composite weighting: a
//! network value is the store-count weighted mean of the two regional values.

use crate::models::{round1, weighted_mean, SalesRow};

pub fn sum_plan_at<'a>(rows: impl IntoIterator<Item = &'a SalesRow>, index: usize) -> f64 {
    round1(rows.into_iter().map(|r| r.plan_values[index]).sum())
}

pub fn sum_actual_at<'a>(
    rows: impl IntoIterator<Item = &'a SalesRow>,
    index: usize,
) -> Option<f64> {
    let mut total = 0.0;
    for row in rows {
        total += row.actual_values[index]?;
    }
    Some(round1(total))
}

pub fn composite_plan_at(
    a: &SalesRow,
    b: &SalesRow,
    count_a: i64,
    count_b: i64,
    index: usize,
) -> f64 {
    weighted_mean(a.plan_values[index], b.plan_values[index], count_a, count_b)
}

pub fn composite_actual_at(
    a: &SalesRow,
    b: &SalesRow,
    count_a: i64,
    count_b: i64,
    index: usize,
) -> Option<f64> {
    match (a.actual_values[index], b.actual_values[index]) {
        (Some(va), Some(vb)) => Some(weighted_mean(va, vb, count_a, count_b)),
        _ => None,
    }
}
