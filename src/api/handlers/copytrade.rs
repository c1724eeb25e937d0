use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::orders::{ApiResponse, UserQuery};
use crate::errors::AppError;
use crate::models::{CopySettings, CopySubscription};
use crate::AppState;

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub user_id: i64,
    pub source_wallet: String,
    #[serde(flatten)]
    pub settings: CopySettings,
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<ApiResponse<CopySubscription>>, AppError> {
    let sub = state
        .engine
        .subscribe(req.user_id, &req.source_wallet, Some(req.settings))
        .await?;
    Ok(ApiResponse::ok(sub))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Json<ApiResponse<Vec<CopySubscription>>> {
    ApiResponse::ok(state.engine.list_subscriptions(query.user_id).await)
}

pub async fn update(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(query): Query<UserQuery>,
    Json(settings): Json<CopySettings>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    state
        .engine
        .update_copy_settings(query.user_id, &wallet, settings)
        .await?;
    Ok(ApiResponse::ok(wallet))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    state.engine.unsubscribe(query.user_id, &wallet).await?;
    Ok(ApiResponse::ok(wallet))
}
