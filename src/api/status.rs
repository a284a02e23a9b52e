use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::AppState;
use crate::domain::TimeSec;
use crate::engine::SwapSnapshot;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct PointResponse {
    pub result: &'static str,
    #[serde(flatten)]
    pub swap: SwapSnapshot,
}

/// Look up one swap by fingerprint.
pub async fn get_swap(
    Path(aliceid): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<PointResponse>, AppError> {
    let swap = state
        .responder
        .point_query(aliceid, TimeSec::now())
        .await
        .ok_or_else(|| AppError::NotFound("cant find aliceid".into()))?;
    Ok(Json(PointResponse {
        result: "success",
        swap,
    }))
}

/// Accept a peer's swapstatus report.
pub async fn post_swapstatus(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    if !payload.is_object() {
        return Err(AppError::BadRequest("report must be a JSON object".into()));
    }
    state
        .responder
        .external_status(&payload, TimeSec::now())
        .await;
    Ok(Json(serde_json::json!({"result": "success"})))
}
