//! Recurring pattern handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{get_actor, AppError, AppState, SuccessResponse};
use cadence_core::{
    models::{
        PatternDecision, PatternFilter, RecurringPattern, RecurringPatternWithTransactions,
        RecurringResponse,
    },
    DetectionResults,
};

/// Query params for listing patterns
#[derive(Debug, Deserialize)]
pub struct RecurringQuery {
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default)]
    pub confirmed_only: bool,
    #[serde(default)]
    pub include_rejected: bool,
}

impl From<RecurringQuery> for PatternFilter {
    fn from(query: RecurringQuery) -> Self {
        Self {
            min_confidence: query.min_confidence,
            confirmed_only: query.confirmed_only,
            include_rejected: query.include_rejected,
        }
    }
}

/// GET /api/recurring - List stored patterns with the spending summary
pub async fn list_recurring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecurringQuery>,
) -> Result<Json<RecurringResponse>, AppError> {
    let filter = PatternFilter::from(query);
    Ok(Json(state.db.list_patterns(&filter)?))
}

/// GET /api/recurring/:id - Pattern with its linked transactions
pub async fn get_recurring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RecurringPatternWithTransactions>, AppError> {
    let pattern = state
        .db
        .get_pattern_with_transactions(id)?
        .ok_or_else(|| AppError::not_found(&format!("Recurring pattern {} not found", id)))?;

    Ok(Json(pattern))
}

/// PUT /api/recurring/:id - Confirm, reject or relabel a pattern
///
/// Only `is_confirmed` and `user_label` are accepted; a blank label clears it.
pub async fn update_recurring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(decision): Json<PatternDecision>,
) -> Result<Json<RecurringPattern>, AppError> {
    let actor = get_actor(&headers);

    let pattern = state
        .db
        .apply_decision(id, &decision, &actor)
        .map_err(AppError::from_core)?;

    Ok(Json(pattern))
}

/// DELETE /api/recurring/:id - Reject a pattern
///
/// The row is kept as rejected until the next recomputation.
pub async fn reject_recurring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = get_actor(&headers);

    state
        .db
        .reject_pattern(id, &actor)
        .map_err(AppError::from_core)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Query params for recalculation
#[derive(Debug, Deserialize)]
pub struct RecalculateQuery {
    /// Return immediately and run detection in the background
    #[serde(default)]
    pub background: bool,
}

/// Result of a recalculation request
#[derive(Serialize)]
#[serde(untagged)]
pub enum RecalculateResponse {
    Completed(DetectionResults),
    Started { started: bool },
}

/// POST /api/recurring/recalculate - Recompute all patterns
///
/// Runs synchronously and returns the run's results; 409 when another run is
/// already in flight. With `?background=true` it returns `{"started": bool}`.
pub async fn recalculate_recurring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecalculateQuery>,
) -> Result<Json<RecalculateResponse>, AppError> {
    if query.background {
        let started = state.detection.trigger_async();
        return Ok(Json(RecalculateResponse::Started { started }));
    }

    let detection = state.detection.clone();
    let results = tokio::task::spawn_blocking(move || detection.run_detection()).await??;

    let Some(results) = results else {
        return Err(AppError::conflict("Detection already running"));
    };

    info!(
        patterns = results.patterns_found(),
        inserted = results.reconcile.inserted,
        removed = results.reconcile.removed,
        "Recurring detection finished"
    );

    Ok(Json(RecalculateResponse::Completed(results)))
}
