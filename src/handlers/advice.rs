use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::models::ObservationRecord;
use crate::services::advisor;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanningAdviceRequest {
    pub title: String,
    pub period: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub records: Vec<ObservationRecord>,
}

#[derive(Debug, Serialize)]
pub struct PlanningAdviceResponse {
    pub advice: String,
}

pub async fn planning(
    State(state): State<AppState>,
    Json(request): Json<PlanningAdviceRequest>,
) -> Json<PlanningAdviceResponse> {
    let advice = advisor::planning_advice(
        &state.config.advisor,
        &request.title,
        &request.period,
        &request.tags,
        &request.records,
    )
    .await;
    Json(PlanningAdviceResponse { advice })
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub data: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub insights: Vec<String>,
}

pub async fn analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Json<AnalysisResponse> {
    let insights =
        advisor::analyze_sales_data(&state.config.advisor, &request.data, &request.prompt).await;
    Json(AnalysisResponse { insights })
}
