use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

use crate::date_utils::DateRange;
use crate::error::{AppError, AppResult};
use crate::models::{round1, Hierarchy, Level, Region, SalesRow, StoreCountSeries};
use crate::store::SalesData;

/// Row selection for windowed views: everything, one group with its
/// leaves, or a single leaf. Applies across all regions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Group(String),
    Leaf(String),
}

impl FromStr for CategoryFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s.is_empty() || s.eq_ignore_ascii_case("all") => Ok(Self::All),
            Some(("GROUP", id)) if !id.is_empty() => Ok(Self::Group(id.to_string())),
            Some(("CHILD", id)) if !id.is_empty() => Ok(Self::Leaf(id.to_string())),
            _ => Err(AppError::Validation(format!(
                "Invalid category filter '{}', expected ALL, GROUP:<id> or CHILD:<id>",
                s
            ))),
        }
    }
}

impl CategoryFilter {
    /// Node keys selected by this filter, `None` meaning every node.
    fn node_keys(&self, hierarchy: &Hierarchy) -> AppResult<Option<HashSet<String>>> {
        match self {
            Self::All => Ok(None),
            Self::Group(id) => {
                let group = hierarchy
                    .group(id)
                    .ok_or_else(|| AppError::NotFound(format!("Category group '{}' not found", id)))?;
                let mut keys: HashSet<String> =
                    group.children.iter().map(|c| c.id.clone()).collect();
                keys.insert(group.id.clone());
                Ok(Some(keys))
            }
            Self::Leaf(id) => {
                hierarchy
                    .leaf(id)
                    .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", id)))?;
                Ok(Some(HashSet::from([id.clone()])))
            }
        }
    }
}

/// A row restricted to the selected window, values aligned with
/// [`WindowView::dates`].
#[derive(Debug, Clone, Serialize)]
pub struct WindowRow {
    pub id: String,
    pub key: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub level: Level,
    pub region: Region,
    pub plan_values: Vec<f64>,
    pub actual_values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowView {
    pub range: DateRange,
    pub today: String,
    pub dates: Vec<String>,
    pub weekdays: Vec<&'static str>,
    /// Position of each window column in the full calendar; edits use these.
    pub indices: Vec<usize>,
    pub store_counts: Vec<StoreCountSeries>,
    pub rows: Vec<WindowRow>,
}

pub fn window_view(
    data: &SalesData,
    range: &DateRange,
    filter: &CategoryFilter,
) -> AppResult<WindowView> {
    let calendar = &data.calendar;
    let indices = calendar.indices_between(range.from, range.to);
    let keys = filter.node_keys(&data.hierarchy)?;

    let rows = data
        .rows
        .iter()
        .filter(|row| keys.as_ref().is_none_or(|k| k.contains(&row.key)))
        .map(|row| WindowRow {
            id: row.id.clone(),
            key: row.key.clone(),
            name: row.name.clone(),
            parent_id: row.parent_id.clone(),
            level: row.level,
            region: row.region,
            plan_values: indices.iter().map(|i| row.plan_values[*i]).collect(),
            actual_values: indices.iter().map(|i| row.actual_values[*i]).collect(),
        })
        .collect();

    let store_counts = data
        .store_counts
        .iter()
        .map(|s| StoreCountSeries {
            region: s.region,
            counts: indices.iter().map(|i| s.counts[*i]).collect(),
        })
        .collect();

    Ok(WindowView {
        range: range.clone(),
        today: calendar.today().format("%Y-%m-%d").to_string(),
        dates: indices.iter().map(|i| calendar.date_string(*i)).collect(),
        weekdays: indices.iter().map(|i| calendar.weekday(*i)).collect(),
        indices,
        store_counts,
        rows,
    })
}

/// Averages over a window, split at today into elapsed and upcoming days.
///
/// `has_past` / `has_future` tell callers whether the corresponding figures
/// exist at all, so an empty half renders as "no data" rather than 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub avg_actual: f64,
    pub avg_plan_past: f64,
    pub avg_plan_future: f64,
    /// Achievement rate in percent.
    pub rate: f64,
    pub diff_percent: f64,
    pub diff_value: f64,
    pub has_past: bool,
    pub has_future: bool,
    pub total_plan_future: f64,
}

pub fn summary(data: &SalesData, row_ids: &[String], range: &DateRange) -> SummaryStats {
    let wanted: HashSet<&str> = row_ids.iter().map(|s| s.as_str()).collect();
    let targets: Vec<&SalesRow> = data
        .rows
        .iter()
        .filter(|r| wanted.contains(r.id.as_str()))
        .collect();

    if targets.is_empty() {
        return SummaryStats::default();
    }

    let mut actual_sum = 0.0;
    let mut past_plan_sum = 0.0;
    let mut past_count = 0usize;
    let mut future_plan_sum = 0.0;
    let mut future_count = 0usize;

    for i in data.calendar.indices_between(range.from, range.to) {
        let daily_plan: f64 = targets.iter().map(|r| r.plan_values[i]).sum();
        if data.calendar.is_elapsed(i) {
            actual_sum += targets
                .iter()
                .map(|r| r.actual_values[i].unwrap_or(0.0))
                .sum::<f64>();
            past_plan_sum += daily_plan;
            past_count += 1;
        } else {
            future_plan_sum += daily_plan;
            future_count += 1;
        }
    }

    let avg_actual = average(actual_sum, past_count);
    let avg_plan_past = average(past_plan_sum, past_count);
    let (rate, diff_percent) = if past_plan_sum > 0.0 {
        (
            actual_sum / past_plan_sum * 100.0,
            (actual_sum - past_plan_sum) / past_plan_sum * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    SummaryStats {
        avg_actual,
        avg_plan_past,
        avg_plan_future: average(future_plan_sum, future_count),
        rate,
        diff_percent,
        diff_value: avg_actual - avg_plan_past,
        has_past: past_count > 0,
        has_future: future_count > 0,
        total_plan_future: future_plan_sum,
    }
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// One date of a single row, as plotted on the trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub index: usize,
    pub date: String,
    pub weekday: &'static str,
    pub elapsed: bool,
    pub plan: f64,
    pub actual: Option<f64>,
    /// `(actual - plan) / plan` in percent, one decimal. Absent for upcoming
    /// days, missing actuals and zero plans.
    pub deviation_percent: Option<f64>,
}

pub fn daily_points(data: &SalesData, row_id: &str, range: &DateRange) -> AppResult<Vec<DailyPoint>> {
    let row = data
        .rows
        .get(row_id)
        .ok_or_else(|| AppError::NotFound(format!("Row '{}' not found", row_id)))?;
    let calendar = &data.calendar;

    Ok(calendar
        .indices_between(range.from, range.to)
        .into_iter()
        .map(|i| {
            let elapsed = calendar.is_elapsed(i);
            let plan = row.plan_values[i];
            let actual = if elapsed { row.actual_values[i] } else { None };
            let deviation_percent = match actual {
                Some(a) if plan != 0.0 => Some(round1((a - plan) / plan * 100.0)),
                _ => None,
            };
            DailyPoint {
                index: i,
                date: calendar.date_string(i),
                weekday: calendar.weekday(i),
                elapsed,
                plan,
                actual,
                deviation_percent,
            }
        })
        .collect())
}

/// Render a window as CSV: one line per row and metric, one column per date.
pub fn export_csv(view: &WindowView) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "region".to_string(),
        "id".to_string(),
        "name".to_string(),
        "level".to_string(),
        "metric".to_string(),
    ];
    header.extend(view.dates.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;

    for row in &view.rows {
        let prefix = [
            row.region.as_str().to_string(),
            row.id.clone(),
            row.name.clone(),
            u8::from(row.level).to_string(),
        ];

        let mut plan = prefix.to_vec();
        plan.push("plan".into());
        plan.extend(row.plan_values.iter().map(|v| v.to_string()));

        let mut actual = prefix.to_vec();
        actual.push("actual".into());
        actual.extend(
            row.actual_values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );

        for record in [plan, actual] {
            writer
                .write_record(&record)
                .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_filter() {
        assert_eq!("ALL".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "GROUP:fresh_dept".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Group("fresh_dept".into())
        );
        assert_eq!(
            "CHILD:meat".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Leaf("meat".into())
        );
        assert!("GROUP:".parse::<CategoryFilter>().is_err());
        assert!("TREE:x".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_filter_keys() {
        let h = Hierarchy::retail();
        let keys = CategoryFilter::Group("fresh_dept".into())
            .node_keys(&h)
            .unwrap()
            .unwrap();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains("fresh_dept"));
        assert!(keys.contains("bakery"));
        assert!(CategoryFilter::All.node_keys(&h).unwrap().is_none());
        assert!(matches!(
            CategoryFilter::Leaf("caviar".into()).node_keys(&h),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(average(10.0, 0), 0.0);
        assert_eq!(average(10.0, 4), 2.5);
    }
}
