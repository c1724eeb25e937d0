use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::orders::{ApiResponse, UserQuery};
use crate::errors::AppError;
use crate::models::SnipeAllocation;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateSnipeRequest {
    pub user_id: i64,
    pub target_asset: String,
    pub max_spend: Decimal,
    pub slippage_pct: Decimal,
    pub stop_loss_pct: Option<Decimal>,
    pub take_profit_pct: Option<Decimal>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSnipeRequest>,
) -> Result<Json<ApiResponse<SnipeAllocation>>, AppError> {
    let alloc = state
        .engine
        .create_snipe(
            req.user_id,
            &req.target_asset,
            req.max_spend,
            req.slippage_pct,
            req.stop_loss_pct,
            req.take_profit_pct,
        )
        .await?;
    Ok(ApiResponse::ok(alloc))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Json<ApiResponse<Vec<SnipeAllocation>>> {
    ApiResponse::ok(state.engine.list_snipes(query.user_id).await)
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    state.engine.cancel_snipe(query.user_id, id).await?;
    Ok(ApiResponse::ok(id))
}
