use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{generate_tracking_id, NewOrder, Order, OrderFilter, OrderStatus, OrderUpdate};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub tracking_id: Option<String>,
    pub customer_name: Option<String>,
    pub address: Option<String>,
    pub item: Option<String>,
    pub qty: Option<i64>,
    pub status: Option<OrderStatus>,
    pub pickup_time: Option<NaiveDateTime>,
    pub assigned_to: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// POST /orders/create
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let item = req
        .item
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .ok_or_else(|| AppError::BadRequest("item is required".to_string()))?;

    let qty = req.qty.unwrap_or(1);
    if qty < 1 {
        return Err(AppError::BadRequest("qty must be at least 1".to_string()));
    }

    let tracking_id = req
        .tracking_id
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| generate_tracking_id(Utc::now().timestamp_millis()));

    let order = state
        .orders
        .create(NewOrder {
            tracking_id,
            customer_name: req.customer_name,
            address: req.address,
            item,
            qty,
            status: req.status.unwrap_or(OrderStatus::Created),
            pickup_time: req.pickup_time,
            assigned_to: req.assigned_to,
            metadata: req.metadata,
        })
        .await?;

    tracing::info!(tracking_id = %order.tracking_id, "order created via api");
    Ok((StatusCode::CREATED, Json(order)))
}

// PUT /orders/modify/:id
pub async fn modify_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<Order>, AppError> {
    if update.is_empty() {
        return Err(AppError::BadRequest("no updatable fields given".to_string()));
    }
    state
        .orders
        .apply_update(&id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub customer_name: Option<String>,
    pub assigned_to: Option<String>,
    pub limit: Option<i64>,
}

// GET /orders/list
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.order_list_limit)
        .clamp(1, 100);
    let filter = OrderFilter {
        customer_name: query.customer_name,
        assigned_to: query.assigned_to,
    };
    let orders = state.orders.recent(&filter, limit).await?;
    Ok(Json(orders))
}

// GET /orders/track/:tracking_id
pub async fn track_order(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let tracking_id = tracking_id.to_uppercase();
    state
        .orders
        .find_by_tracking_id(&tracking_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {tracking_id}")))
}

// GET /orders/:id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    state
        .orders
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

// DELETE /orders/:id
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.orders.delete(&id).await? {
        return Err(AppError::NotFound(format!("order {id}")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
