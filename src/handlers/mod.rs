/// HTTP request handlers
use crate::domain::{CalculationBreakdown, CalculationInput, CatalogFile, Health};
use crate::errors::ApiError;
use crate::services::{CostService, TrackPreview};
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cost_service: Arc<CostService>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(alias = "flightDataCsv")]
    pub flight_track_csv: String,
}

#[derive(Serialize)]
pub struct BreakdownBody {
    pub breakdown: CalculationBreakdown,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Current catalog snapshot
pub async fn get_catalog(State(state): State<AppState>) -> Json<SuccessResponse<CatalogFile>> {
    let catalogs = state.cost_service.catalogs().await;
    Json(SuccessResponse::new(catalogs.to_file()))
}

/// Parse a track without pricing it
pub async fn preview_track(
    State(state): State<AppState>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<SuccessResponse<TrackPreview>>, ApiError> {
    let preview = state.cost_service.preview(&req.flight_track_csv).await?;
    Ok(Json(SuccessResponse::new(preview)))
}

/// Price a flight
pub async fn calculate(
    State(state): State<AppState>,
    Json(input): Json<CalculationInput>,
) -> Result<Json<SuccessResponse<BreakdownBody>>, ApiError> {
    let breakdown = state.cost_service.calculate(input).await?;
    Ok(Json(SuccessResponse::new(BreakdownBody { breakdown })))
}
