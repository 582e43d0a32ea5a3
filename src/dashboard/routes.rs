//! Dashboard API route handlers.
//!
//! JSON in, JSON out; the presentation layer renders these responses.
//! Validation failures surface as 422 with the engine's own message,
//! storage/feed trouble as 500.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::clv;
use crate::engine::PredictionEngine;
use crate::types::{BetRecord, EngineError, HistoricalContext, MatchInfo, OddsTick};

/// Shared state for all routes.
pub struct DashboardState {
    pub engine: Arc<PredictionEngine>,
}

pub type AppState = Arc<DashboardState>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Map engine errors onto HTTP statuses.
fn error_response(err: EngineError) -> Response {
    let status = match err {
        EngineError::InvalidOdds(_)
        | EngineError::InvalidProbability(_)
        | EngineError::InvalidBankroll(_)
        | EngineError::EmptyHistory(_)
        | EngineError::MissingPrice { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Store(_) | EngineError::Feed(_) | EngineError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
    pub context: HistoricalContext,
    /// Clear this match from the local cache before computing. An
    /// already-persisted lock still wins.
    #[serde(default)]
    pub regenerate: bool,
}

pub async fn generate_prediction(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let result = if request.regenerate {
        state
            .engine
            .regenerate_prediction(&request.match_info, &request.context)
            .await
    } else {
        state
            .engine
            .generate_prediction(&request.match_info, &request.context)
            .await
    };

    match result {
        Ok(prediction) => Json(prediction).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Response {
    match state.engine.get_locked(&match_id).await {
        Ok(Some(prediction)) => Json(prediction).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("no locked prediction for {match_id}"),
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ClvRequest {
    pub predicted_odds: f64,
    pub closing_odds: f64,
    #[serde(default)]
    pub opening_odds: Option<f64>,
}

pub async fn grade_clv(Json(request): Json<ClvRequest>) -> Response {
    match clv::calculate_clv(
        request.predicted_odds,
        request.closing_odds,
        request.opening_odds,
    ) {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct LineMovementRequest {
    pub history: Vec<OddsTick>,
}

pub async fn line_movement(Json(request): Json<LineMovementRequest>) -> Response {
    match clv::analyze_line_movement(&request.history) {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub bets: Vec<BetRecord>,
}

pub async fn aggregate_clv(Json(request): Json<AggregateRequest>) -> Json<clv::ClvSummary> {
    Json(clv::aggregate_clv(&request.bets))
}
