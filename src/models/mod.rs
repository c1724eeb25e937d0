pub mod allocation;
pub mod order;
pub mod subscription;

pub use allocation::{AllocationError, AllocationStatus, SnipeAllocation, SnipeExecution};
pub use order::{ExecutionOutcome, OrderKind, OrderStatus, TradeOrder};
pub use subscription::{CopySettings, CopyStats, CopySubscription};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TradeDirection
// ---------------------------------------------------------------------------

/// Classified direction of an observed source-wallet trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
    Swap,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
            TradeDirection::Swap => "swap",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// SourceTrade — observed wallet activity, the copy-relay input event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTrade {
    pub wallet: String,
    /// Venue transaction reference; the relay's dedup key.
    pub tx_ref: String,
    pub direction: TradeDirection,
    pub input_asset: String,
    pub output_asset: String,
    pub amount: Decimal,
    pub amount_usd: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for SourceTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SourceTrade: wallet={} tx={} dir={} amount={}",
            &self.wallet[..8.min(self.wallet.len())],
            &self.tx_ref[..8.min(self.tx_ref.len())],
            self.direction,
            self.amount,
        )
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountTier {
    Free,
    Premium,
    Pro,
}

impl AccountTier {
    /// Copy trading and snipe allocations are gated behind a paid tier.
    pub fn has_advanced_trading(self) -> bool {
        self >= AccountTier::Premium
    }
}

/// Account limits and entitlements the validator checks orders against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub user_id: i64,
    pub tier: AccountTier,
    /// Personal per-trade cap; falls back to the global max when unset.
    pub max_trade_amount: Option<Decimal>,
}

impl AccountProfile {
    pub fn new(user_id: i64, tier: AccountTier) -> Self {
        Self {
            user_id,
            tier,
            max_trade_amount: None,
        }
    }
}
