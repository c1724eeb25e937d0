use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::store::Store;

/// Collects the platform's cut after a completed trade. Returns whether the
/// deduction went through; callers treat `false` as a logged warning, never
/// as a reason to unwind the trade.
#[async_trait]
pub trait FeeCollector: Send + Sync {
    async fn deduct(&self, user_id: i64, trade_amount: Decimal, trade_ref: &str) -> bool;
}

/// Percentage-of-trade fee with a floor.
pub struct PercentageFeeCollector {
    store: Arc<dyn Store>,
    fee_pct: Decimal,
    min_fee: Decimal,
}

impl PercentageFeeCollector {
    pub fn new(store: Arc<dyn Store>, fee_pct: Decimal, min_fee: Decimal) -> Self {
        Self {
            store,
            fee_pct,
            min_fee,
        }
    }

    pub fn fee_for(&self, trade_amount: Decimal) -> Decimal {
        (trade_amount * self.fee_pct / Decimal::ONE_HUNDRED).max(self.min_fee)
    }
}

#[async_trait]
impl FeeCollector for PercentageFeeCollector {
    async fn deduct(&self, user_id: i64, trade_amount: Decimal, trade_ref: &str) -> bool {
        let fee = self.fee_for(trade_amount);
        match self.store.record_fee(user_id, fee, trade_ref).await {
            Ok(()) => {
                tracing::debug!(user_id, fee = %fee, trade_ref, "Fee recorded");
                true
            }
            Err(e) => {
                tracing::warn!(user_id, fee = %fee, error = %e, "Fee recording failed");
                false
            }
        }
    }
}
