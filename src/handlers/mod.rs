pub mod assistant;
pub mod health;
pub mod orders;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/ai", post(assistant::reply))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/modify/:id", put(orders::modify_order))
        .route("/orders/list", get(orders::list_orders))
        .route("/orders/track/:tracking_id", get(orders::track_order))
        .route(
            "/orders/:id",
            get(orders::get_order).delete(orders::delete_order),
        )
        .with_state(state)
}
