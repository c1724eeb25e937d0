use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::execution::validator::ValidationError;
use crate::models::{AllocationError, OrderStatus};
use crate::store::StoreError;

/// Engine error taxonomy. Validation errors reject before any state exists;
/// execution failures leave the order Failed with no retry; persistence
/// failures mean the in-memory transition was rolled back; collaborator
/// failures happen after a trade completed and are logged, never propagated
/// to the trade outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("order {0} already claimed for execution")]
    AlreadyClaimed(Uuid),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order {id} cannot be cancelled while {status}")]
    CancelRejected { id: Uuid, status: OrderStatus },

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("subscription for wallet {wallet} not found")]
    SubscriptionNotFound { wallet: String },

    #[error("allocation {0} not found")]
    AllocationNotFound(Uuid),
}

// ---------------------------------------------------------------------------
// HTTP boundary error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(_)
            | EngineError::Execution(_)
            | EngineError::AlreadyClaimed(_)
            | EngineError::CancelRejected { .. }
            | EngineError::InvalidTransition { .. }
            | EngineError::Allocation(_) => AppError::BadRequest(e.to_string()),
            EngineError::OrderNotFound(_)
            | EngineError::SubscriptionNotFound { .. }
            | EngineError::AllocationNotFound(_) => AppError::NotFound(e.to_string()),
            EngineError::Persistence(_) => AppError::Unavailable(e.to_string()),
            EngineError::Collaborator(_) => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
