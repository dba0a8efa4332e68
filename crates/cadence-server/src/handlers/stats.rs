//! Spending statistics handlers
//!
//! All endpoints accept the same filter parameters as `GET /api/transactions`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use super::transactions::FilterQuery;
use crate::{AppError, AppState};
use cadence_core::db::{CategoryTotal, PaymentSummary, SourceTotal};

/// GET /api/stats/summary - Paid and unpaid totals
pub async fn payment_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<PaymentSummary>, AppError> {
    let filter = params.to_filter()?;
    Ok(Json(state.db.payment_summary(&filter)?))
}

/// GET /api/stats/categories - Totals per category, largest first
pub async fn category_totals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Vec<CategoryTotal>>, AppError> {
    let filter = params.to_filter()?;
    Ok(Json(state.db.category_totals(&filter)?))
}

/// GET /api/stats/sources - Totals per source, largest first
pub async fn source_totals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Vec<SourceTotal>>, AppError> {
    let filter = params.to_filter()?;
    Ok(Json(state.db.source_totals(&filter)?))
}

/// GET /api/stats/top-category - The largest category, or null
pub async fn top_category(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Option<CategoryTotal>>, AppError> {
    let filter = params.to_filter()?;
    Ok(Json(state.db.top_category(&filter)?))
}
