use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderKind, TradeOrder};
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub kind: OrderKind,
    pub input_asset: String,
    pub output_asset: String,
    pub amount: Decimal,
    pub slippage_pct: Decimal,
    pub trigger_price: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub stop_loss_pct: Option<Decimal>,
    pub take_profit_pct: Option<Decimal>,
}

impl CreateOrderRequest {
    fn into_order(self) -> TradeOrder {
        let mut order = TradeOrder::new(
            self.user_id,
            self.kind,
            self.input_asset,
            self.output_asset,
            self.amount,
            self.slippage_pct,
        )
        .with_risk(self.stop_loss_pct, self.take_profit_pct);
        if let Some(price) = self.trigger_price {
            order = order.with_trigger(price, self.expires_at);
        }
        order
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<TradeOrder>>, AppError> {
    let order = state.engine.submit_order(req.into_order()).await?;
    Ok(ApiResponse::ok(order))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Json<ApiResponse<Vec<TradeOrder>>> {
    ApiResponse::ok(state.engine.list_orders(query.user_id).await)
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<TradeOrder>>, AppError> {
    let order = state.engine.get_order(query.user_id, id).await?;
    Ok(ApiResponse::ok(order))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    state.engine.cancel_order(query.user_id, id).await?;
    Ok(ApiResponse::ok(id))
}
