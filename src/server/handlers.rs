//! HTTP handlers: service info, health, and the reading endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::state::AppState;
use crate::corpus::{Query, Reading};
use crate::error::ApiError;

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "🔮 塔羅 API 運作中",
        "status": "online",
        "endpoints": {
            "今日運勢": "POST /api/tarot",
            "健康檢查": "GET /health"
        }
    }))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let readiness = state.readiness();
    Json(json!({
        "status": "healthy",
        "model_loaded": state.pipeline().is_some(),
        "phase": readiness.phase(),
    }))
}

/// `POST /api/tarot`
///
/// Readiness is checked before the body, so every request made during startup
/// gets a 503 whatever it contains.
pub async fn tarot(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Query>, JsonRejection>,
) -> Result<Json<Reading>, ApiError> {
    let pipeline = state.pipeline().ok_or(ApiError::NotReady)?;
    let Json(query) = payload?;

    tracing::info!(question = %query.question(), "reading requested");

    let reading = pipeline.read(&query).await.map_err(|e| {
        tracing::error!(error = %format!("{e:#}"), card = %query.card, "reading failed");
        ApiError::pipeline(&e)
    })?;

    tracing::info!(card = %reading.card, chars = reading.analysis.chars().count(), "reading complete");
    Ok(Json(reading))
}
