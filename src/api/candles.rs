use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::TimeSec;
use crate::engine::{CandleBar, WindowParams};
use crate::error::AppError;

fn default_timescale() -> i64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct CandlesQuery {
    pub base: String,
    pub rel: String,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
    #[serde(default = "default_timescale")]
    pub timescale: i64,
}

#[derive(Debug, Serialize)]
pub struct CandlesResponse {
    pub result: &'static str,
    pub base: String,
    pub rel: String,
    pub timescale: i64,
    pub bars: Vec<CandleBar>,
}

pub async fn get_candles(
    Query(params): Query<CandlesQuery>,
    State(state): State<AppState>,
) -> Result<Json<CandlesResponse>, AppError> {
    if params.base.is_empty() || params.rel.is_empty() {
        return Err(AppError::BadRequest("base and rel are required".into()));
    }
    let window = WindowParams::pair(
        crate::domain::Coin::new(params.base.clone()),
        crate::domain::Coin::new(params.rel.clone()),
        params.start,
        params.end,
    );
    let bars = state
        .responder
        .build_candles(&window, params.timescale, TimeSec::now())
        .await?;
    Ok(Json(CandlesResponse {
        result: "success",
        base: params.base,
        rel: params.rel,
        timescale: params.timescale,
        bars,
    }))
}
