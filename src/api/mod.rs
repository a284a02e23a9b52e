pub mod candles;
pub mod events;
pub mod health;
pub mod status;
pub mod swaps;

use crate::engine::Responder;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<Responder>,
}

impl AppState {
    pub fn new(responder: Arc<Responder>) -> Self {
        Self { responder }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/events", post(events::post_event))
        .route("/v1/swaps", get(swaps::get_swaps))
        .route("/v1/swaps/:aliceid", get(status::get_swap))
        .route("/v1/swapstatus", post(status::post_swapstatus))
        .route("/v1/candles", get(candles::get_candles))
        .layer(cors)
        .with_state(state)
}
