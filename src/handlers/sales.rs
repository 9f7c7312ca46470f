use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::date_utils::{DateFilterable, DateRange};
use crate::error::{AppError, AppResult};
use crate::models::{Hierarchy, Region, StoreCountSeries};
use crate::services::query::{self, CategoryFilter, DailyPoint, SummaryStats, WindowView};
use crate::state::AppState;
use crate::store::{RowStore, SalesData};

#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub preset: Option<String>,
    pub nav: Option<String>,
    pub category: Option<String>,
}

impl DateFilterable for WindowParams {
    fn from_date(&self) -> Option<&String> {
        self.from_date.as_ref()
    }

    fn to_date(&self) -> Option<&String> {
        self.to_date.as_ref()
    }

    fn preset(&self) -> Option<&String> {
        self.preset.as_ref()
    }

    fn nav(&self) -> Option<&String> {
        self.nav.as_ref()
    }
}

impl WindowParams {
    fn category_filter(&self) -> AppResult<CategoryFilter> {
        self.category
            .as_deref()
            .map(str::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub dates: Vec<String>,
    pub weekdays: Vec<&'static str>,
    pub today: String,
    pub default_window: DateRange,
}

pub async fn calendar(State(state): State<AppState>) -> AppResult<Json<CalendarResponse>> {
    let data = state.snapshot()?;
    let calendar = &data.calendar;
    let default_window = WindowParams::default().resolve_date_range(calendar)?;

    Ok(Json(CalendarResponse {
        dates: calendar.date_strings(),
        weekdays: calendar.weekdays().to_vec(),
        today: calendar.today().format("%Y-%m-%d").to_string(),
        default_window,
    }))
}

pub async fn hierarchy(State(state): State<AppState>) -> AppResult<Json<Hierarchy>> {
    let data = state.snapshot()?;
    Ok(Json(data.hierarchy.as_ref().clone()))
}

pub async fn rows(State(state): State<AppState>) -> AppResult<Json<RowStore>> {
    Ok(Json(state.store.rows()?))
}

pub async fn store_counts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StoreCountSeries>>> {
    Ok(Json(state.store.store_counts()?))
}

pub async fn window(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<Json<WindowView>> {
    let data = state.snapshot()?;
    let range = params.resolve_date_range(&data.calendar)?;
    let filter = params.category_filter()?;
    Ok(Json(query::window_view(&data, &range, &filter)?))
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    /// Comma separated row ids; defaults to the network root.
    pub ids: Option<String>,
    #[serde(flatten)]
    pub window: WindowParams,
}

pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<SummaryStats>> {
    let data = state.snapshot()?;
    let range = params.window.resolve_date_range(&data.calendar)?;
    let ids: Vec<String> = params
        .ids
        .as_deref()
        .unwrap_or("Total_total")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Ok(Json(query::summary(&data, &ids, &range)))
}

pub async fn points(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> AppResult<Json<Vec<DailyPoint>>> {
    let data = state.snapshot()?;
    let range = params.resolve_date_range(&data.calendar)?;
    Ok(Json(query::daily_points(&data, &id, &range)?))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> AppResult<impl IntoResponse> {
    let data = state.snapshot()?;
    let range = params.resolve_date_range(&data.calendar)?;
    let filter = params.category_filter()?;
    let view = query::window_view(&data, &range, &filter)?;
    let csv = query::export_csv(&view)?;

    tracing::info!(rows = view.rows.len(), days = view.dates.len(), "Exporting sales window");

    let disposition = format!(
        "attachment; filename=\"sales-plan_{}_{}.csv\"",
        range.from_str(),
        range.to_str()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

#[derive(Debug, Deserialize)]
pub struct PlanEdit {
    pub row_id: String,
    pub date_index: usize,
    pub value: f64,
}

pub async fn update_plan(
    State(state): State<AppState>,
    Json(edit): Json<PlanEdit>,
) -> AppResult<Json<RowStore>> {
    let data = state
        .store
        .set_plan_value(&edit.row_id, edit.date_index, edit.value)?;
    Ok(Json(data.rows.clone()))
}

#[derive(Debug, Deserialize)]
pub struct StoreCountEdit {
    pub region: String,
    pub date_index: usize,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StoreCountUpdate {
    pub store_counts: Vec<StoreCountSeries>,
    pub rows: RowStore,
}

impl From<&SalesData> for StoreCountUpdate {
    fn from(data: &SalesData) -> Self {
        Self {
            store_counts: data.store_counts_snapshot(),
            rows: data.rows.clone(),
        }
    }
}

pub async fn update_store_count(
    State(state): State<AppState>,
    Json(edit): Json<StoreCountEdit>,
) -> AppResult<Json<StoreCountUpdate>> {
    let region: Region = edit
        .region
        .parse()
        .map_err(|_| AppError::Validation(format!("Unknown region '{}'", edit.region)))?;
    let data = state
        .store
        .set_store_count(region, edit.date_index, edit.count)?;
    Ok(Json(StoreCountUpdate::from(data.as_ref())))
}
