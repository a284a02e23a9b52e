use axum::extract::State;
use axum::Json;
use serde_json::Value;

use super::AppState;
use crate::error::AppError;

/// Append one raw lifecycle event to the log. The event is not applied
/// here; the next query pass ingests it.
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<Value>,
) -> Result<Json<Value>, AppError> {
    if !event.is_object() {
        return Err(AppError::BadRequest("event must be a JSON object".into()));
    }
    state.responder.record_event(&event)?;
    Ok(Json(serde_json::json!({"result": "success"})))
}
