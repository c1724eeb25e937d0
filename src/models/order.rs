use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a trade order does once its conditions are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    MarketBuy,
    MarketSell,
    LimitBuy,
    LimitSell,
    Snipe,
}

impl OrderKind {
    /// Market orders execute immediately on admission.
    pub fn is_market(self) -> bool {
        matches!(self, OrderKind::MarketBuy | OrderKind::MarketSell)
    }

    pub fn is_limit(self) -> bool {
        matches!(self, OrderKind::LimitBuy | OrderKind::LimitSell)
    }

    /// Buys spend the input asset to acquire the output asset.
    pub fn is_buy(self) -> bool {
        matches!(
            self,
            OrderKind::MarketBuy | OrderKind::LimitBuy | OrderKind::Snipe
        )
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderKind::MarketBuy => "market_buy",
            OrderKind::MarketSell => "market_sell",
            OrderKind::LimitBuy => "limit_buy",
            OrderKind::LimitSell => "limit_sell",
            OrderKind::Snipe => "snipe",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Failed
                | OrderStatus::Cancelled
                | OrderStatus::Expired
        )
    }

    /// The only legal transitions: Pending may begin executing, be cancelled,
    /// or expire; Executing resolves to Completed or Failed. Everything else
    /// is rejected by the ledger.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Executing | Cancelled | Expired) | (Executing, Completed | Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Executing => "executing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Terminal outcome reported by the executor when an order leaves Executing.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed {
        realized_amount: Decimal,
        venue_ref: String,
        /// Price per output token paid on a buy; basis for drawdown checks.
        entry_price: Option<Decimal>,
    },
    Failed {
        error: String,
    },
}

// ---------------------------------------------------------------------------
// TradeOrder
// ---------------------------------------------------------------------------

/// A user's trade intent, from admission through its terminal state.
///
/// Amounts are denominated in the input asset for buys and in the sold
/// asset for sells. `trigger_price` and `expires_at` are set for limit and
/// snipe orders; `entry_price` is recorded once a buy completes so the
/// stop-loss monitor can compute drawdown against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    pub id: Uuid,
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
    pub entry_price: Option<Decimal>,
    pub stop_loss_triggered: bool,

    pub status: OrderStatus,
    pub realized_amount: Option<Decimal>,
    pub venue_ref: Option<String>,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TradeOrder {
    pub fn new(
        user_id: i64,
        kind: OrderKind,
        input_asset: impl Into<String>,
        output_asset: impl Into<String>,
        amount: Decimal,
        slippage_pct: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            input_asset: input_asset.into(),
            output_asset: output_asset.into(),
            amount,
            slippage_pct,
            trigger_price: None,
            expires_at: None,
            stop_loss_pct: None,
            take_profit_pct: None,
            entry_price: None,
            stop_loss_triggered: false,
            status: OrderStatus::Pending,
            realized_amount: None,
            venue_ref: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_trigger(mut self, price: Decimal, expires_at: Option<DateTime<Utc>>) -> Self {
        self.trigger_price = Some(price);
        self.expires_at = expires_at;
        self
    }

    pub fn with_risk(
        mut self,
        stop_loss_pct: Option<Decimal>,
        take_profit_pct: Option<Decimal>,
    ) -> Self {
        self.stop_loss_pct = stop_loss_pct;
        self.take_profit_pct = take_profit_pct;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// True for completed buys with an untriggered stop-loss: these stay in
    /// the ledger after finalization so the stop-loss monitor can watch them.
    pub fn needs_stop_loss_watch(&self) -> bool {
        self.status == OrderStatus::Completed
            && !self.stop_loss_triggered
            && self.entry_price.is_some()
            && self.stop_loss_pct.is_some_and(|pct| pct > Decimal::ZERO)
    }
}
