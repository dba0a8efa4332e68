//! Transaction handlers
//!
//! Edits and deletions kick off a background detection run when they can
//! change which patterns exist.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::{get_actor, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use cadence_core::{
    db::{PageRequest, TransactionPage},
    models::{Transaction, TransactionPatch},
    TransactionFilter,
};

/// Filter parameters shared by the transaction list and the stats endpoints
///
/// List values are comma-separated; empty entries are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub file_ids: Option<String>,
    /// Substrings of import file names
    pub file_names: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub exclude_categories: Option<String>,
    pub exclude_sources: Option<String>,
    pub is_paid: Option<bool>,
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<String>,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request(&format!("Invalid {} date (expected YYYY-MM-DD)", name))
            })
        })
        .transpose()
}

impl FilterQuery {
    pub fn to_filter(&self) -> Result<TransactionFilter, AppError> {
        let file_ids = split_list(self.file_ids.as_deref())
            .iter()
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|_| AppError::bad_request(&format!("Invalid file id: {}", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let filter = TransactionFilter {
            file_ids,
            file_names: split_list(self.file_names.as_deref()),
            source: self.source.clone(),
            category: self.category.clone(),
            exclude_categories: split_list(self.exclude_categories.as_deref()),
            exclude_sources: split_list(self.exclude_sources.as_deref()),
            ..TransactionFilter::new()
        };

        Ok(filter.is_paid(self.is_paid).date_range(
            parse_date("from", self.from.as_deref())?,
            parse_date("to", self.to.as_deref())?,
        ))
    }
}

/// Paging parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    50
}

/// GET /api/transactions - One page of the filtered transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(paging): Query<PageQuery>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<TransactionPage>, AppError> {
    let filter = params.to_filter()?;
    let page = PageRequest {
        page: paging.page.max(1),
        per_page: paging.per_page.clamp(1, MAX_PAGE_LIMIT),
    };

    Ok(Json(state.db.list_transactions(&filter, Some(page))?))
}

/// GET /api/transactions/:id - Get one transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;

    Ok(Json(transaction))
}

/// PUT /api/transactions/:id - Edit some fields of a transaction
///
/// Unknown fields are rejected.
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(patch): Json<TransactionPatch>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .update_transaction(id, &patch)
        .map_err(AppError::from_core)?;

    info!(actor = %get_actor(&headers), transaction_id = id, "Updated transaction");

    if patch.touches_detection() {
        state.detection.trigger_async();
    }

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id - Delete one transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_transaction(id)? {
        return Err(AppError::not_found(&format!("Transaction {} not found", id)));
    }

    info!(actor = %get_actor(&headers), transaction_id = id, "Deleted transaction");
    state.detection.trigger_async();

    Ok(Json(SuccessResponse { success: true }))
}
