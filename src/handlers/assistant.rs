use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ReplyEnvelope, Utterance};
use crate::services::conversation;
use crate::state::AppState;

const DEFAULT_USER: &str = "demo-user";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub text: String,
    pub user_id: Option<String>,
}

// POST /api/ai
pub async fn reply(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssistantRequest>,
) -> Result<Json<ReplyEnvelope>, AppError> {
    if payload.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let user_id = payload
        .user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());

    let envelope = conversation::handle_turn(state, Utterance::new(user_id, payload.text)).await;
    Ok(Json(envelope))
}
