use rust_decimal::Decimal;
use thiserror::Error;

use crate::clients::ExecutionClient;
use crate::models::{AccountProfile, OrderKind, TradeOrder};

/// Global admission bounds, from config.
#[derive(Debug, Clone)]
pub struct OrderLimits {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub min_slippage_pct: Decimal,
    pub max_slippage_pct: Decimal,
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self {
            min_amount: Decimal::new(1, 2),  // 0.01 SOL
            max_amount: Decimal::from(10),   // 10 SOL
            min_slippage_pct: Decimal::new(1, 1), // 0.1%
            max_slippage_pct: Decimal::from(50),  // 50%
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("amount {amount} below minimum trade size {min}")]
    AmountTooSmall { amount: Decimal, min: Decimal },

    #[error("amount {amount} above maximum trade size {max}")]
    AmountTooLarge { amount: Decimal, max: Decimal },

    #[error("amount {amount} exceeds account trade limit {limit}")]
    AccountLimitExceeded { amount: Decimal, limit: Decimal },

    #[error("invalid asset address: {0}")]
    InvalidAsset(String),

    #[error("address validation unavailable: {0}")]
    AddressCheckUnavailable(String),

    #[error("slippage {pct}% outside allowed range [{min}%, {max}%]")]
    SlippageOutOfRange {
        pct: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("limit order missing trigger price")]
    MissingTrigger,

    #[error("{feature} requires a premium subscription")]
    TierRequired { feature: &'static str },

    #[error("unknown account {0}")]
    UnknownAccount(i64),
}

/// Check a proposed order against account limits, bounds, and address
/// validity before admission. Checks run cheapest-first and the first
/// failure wins; nothing is mutated here.
pub async fn validate_order(
    order: &TradeOrder,
    account: &AccountProfile,
    limits: &OrderLimits,
    execution: &dyn ExecutionClient,
) -> Result<(), ValidationError> {
    // 1. Global amount bounds
    if order.amount < limits.min_amount {
        return Err(ValidationError::AmountTooSmall {
            amount: order.amount,
            min: limits.min_amount,
        });
    }
    if order.amount > limits.max_amount {
        return Err(ValidationError::AmountTooLarge {
            amount: order.amount,
            max: limits.max_amount,
        });
    }

    // 2. Personal cap
    if let Some(personal_max) = account.max_trade_amount {
        if order.amount > personal_max {
            return Err(ValidationError::AccountLimitExceeded {
                amount: order.amount,
                limit: personal_max,
            });
        }
    }

    // 3. Asset address format (delegated to the venue)
    for asset in [&order.input_asset, &order.output_asset] {
        let valid = execution
            .validate_address(asset)
            .await
            .map_err(|e| ValidationError::AddressCheckUnavailable(e.to_string()))?;
        if !valid {
            return Err(ValidationError::InvalidAsset(asset.clone()));
        }
    }

    // 4. Slippage bounds
    if order.slippage_pct < limits.min_slippage_pct || order.slippage_pct > limits.max_slippage_pct
    {
        return Err(ValidationError::SlippageOutOfRange {
            pct: order.slippage_pct,
            min: limits.min_slippage_pct,
            max: limits.max_slippage_pct,
        });
    }

    // 5. Structural: limit orders need a trigger
    if order.kind.is_limit() && order.trigger_price.is_none() {
        return Err(ValidationError::MissingTrigger);
    }

    // 6. Feature gating
    if order.kind == OrderKind::Snipe && !account.tier.has_advanced_trading() {
        return Err(ValidationError::TierRequired { feature: "sniping" });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
