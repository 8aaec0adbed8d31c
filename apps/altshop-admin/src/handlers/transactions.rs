use altshop_db::models::common::Page;
use altshop_db::models::transaction::{Transaction, TransactionStatistics, TransactionStatus};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<TransactionStatus>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<Json<Page<Transaction>>> {
    let page = super::PageQuery { page: query.page, limit: query.limit }.request();
    let (data, total) = state.transactions.list(page, query.status).await?;
    Ok(Json(Page::new(data, total, page.page, page.limit)))
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<TransactionStatistics>> {
    Ok(Json(state.transactions.statistics().await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Transaction>> {
    state
        .transactions
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Transaction", id))
}

pub async fn get_user_transactions(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.transactions.get_by_user(telegram_id).await?))
}
