use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::domain::{Coin, Hash256, TimeSec};
use crate::engine::{WindowParams, WindowedReport};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SwapsQuery {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
    pub base: Option<String>,
    pub rel: Option<String>,
    pub gui: Option<String>,
    pub pubkey: Option<String>,
}

pub async fn get_swaps(
    Query(params): Query<SwapsQuery>,
    State(state): State<AppState>,
) -> Result<Json<WindowedReport>, AppError> {
    let window = parse_window(&params)?;
    let report = state
        .responder
        .windowed_query(&window, TimeSec::now())
        .await?;
    Ok(Json(report))
}

pub(super) fn parse_window(params: &SwapsQuery) -> Result<WindowParams, AppError> {
    let pubkey = match params.pubkey.as_deref() {
        Some("") | None => None,
        Some(hex_str) => {
            let parsed: Hash256 = hex_str
                .parse()
                .map_err(|_| AppError::BadRequest("invalid pubkey".into()))?;
            if parsed.is_zero() {
                None
            } else {
                Some(parsed)
            }
        }
    };
    let coin = |value: &Option<String>| match value.as_deref() {
        Some("") | None => None,
        Some(name) => Some(Coin::new(name.to_string())),
    };
    Ok(WindowParams {
        start: params.start,
        end: params.end,
        gui: params.gui.clone().filter(|gui| !gui.is_empty()),
        pubkey,
        base: coin(&params.base),
        rel: coin(&params.rel),
    })
}
