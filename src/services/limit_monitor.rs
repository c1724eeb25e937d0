use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::clients::PriceOracle;
use crate::errors::EngineError;
use crate::execution::{MarketExecutor, OrderLedger};
use crate::models::{OrderKind, TradeOrder};
use crate::services::oracle_health::OracleHealth;

/// Watches pending limit orders and fires them when the oracle price
/// crosses their trigger. Also owns the expiry sweep, so a stale order is
/// retired before it can execute on the same tick, and re-drives any
/// finalization the store rejected.
pub struct LimitMonitor {
    ledger: Arc<OrderLedger>,
    executor: Arc<MarketExecutor>,
    oracle: Arc<dyn PriceOracle>,
    health: Arc<OracleHealth>,
    tick_interval: Duration,
}

impl LimitMonitor {
    pub fn new(
        ledger: Arc<OrderLedger>,
        executor: Arc<MarketExecutor>,
        oracle: Arc<dyn PriceOracle>,
        health: Arc<OracleHealth>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            executor,
            oracle,
            health,
            tick_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    pub async fn tick(&self) {
        // Outcomes that could not be persisted last time get another chance
        // before any new work is considered.
        self.ledger.retry_unsaved_outcomes().await;

        let expired = self.ledger.expire_older_than(Utc::now()).await;
        if !expired.is_empty() {
            counter!("orders_expired").increment(expired.len() as u64);
        }

        for order in self.ledger.pending_limit_orders().await {
            let asset = watched_asset(&order);
            let quote = match self.oracle.get_price(asset).await {
                Ok(Some(q)) => {
                    self.health.record_success(asset);
                    q
                }
                Ok(None) => {
                    self.health.record_miss(asset);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        asset = %asset,
                        error = %e,
                        "Price check failed for limit order"
                    );
                    continue;
                }
            };

            if !trigger_crossed(&order, quote.price) {
                continue;
            }

            tracing::info!(
                order_id = %order.id,
                kind = %order.kind,
                trigger = %order.trigger_price.unwrap_or_default(),
                price = %quote.price,
                "Limit trigger crossed"
            );

            match self.executor.execute(order.id).await {
                Ok(_) => {}
                Err(EngineError::AlreadyClaimed(id)) => {
                    tracing::debug!(order_id = %id, "Limit order claimed elsewhere");
                }
                Err(e) => {
                    tracing::error!(order_id = %order.id, error = %e, "Limit execution failed");
                }
            }
        }
    }
}

/// The trigger tracks the traded token, not the base asset: the token being
/// acquired on a buy, the token being sold on a sell.
fn watched_asset(order: &TradeOrder) -> &str {
    match order.kind {
        OrderKind::LimitSell => &order.input_asset,
        _ => &order.output_asset,
    }
}

/// Buys fire at or below the trigger, sells at or above it.
fn trigger_crossed(order: &TradeOrder, price: rust_decimal::Decimal) -> bool {
    let Some(trigger) = order.trigger_price else {
        return false;
    };
    match order.kind {
        OrderKind::LimitBuy => price <= trigger,
        OrderKind::LimitSell => price >= trigger,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn limit(kind: OrderKind, trigger: Decimal) -> TradeOrder {
        TradeOrder::new(1, kind, "SOL", "TOKEN", Decimal::ONE, Decimal::ONE)
            .with_trigger(trigger, None)
    }

    #[test]
    fn test_buy_fires_at_or_below_trigger() {
        let order = limit(OrderKind::LimitBuy, Decimal::from(10));
        assert!(trigger_crossed(&order, Decimal::from(10)));
        assert!(trigger_crossed(&order, Decimal::new(95, 1)));
        assert!(!trigger_crossed(&order, Decimal::from(11)));
    }

    #[test]
    fn test_sell_fires_at_or_above_trigger() {
        let order = limit(OrderKind::LimitSell, Decimal::from(10));
        assert!(trigger_crossed(&order, Decimal::from(10)));
        assert!(trigger_crossed(&order, Decimal::from(12)));
        assert!(!trigger_crossed(&order, Decimal::new(95, 1)));
    }

    #[test]
    fn test_market_orders_never_trigger() {
        let order = TradeOrder::new(
            1,
            OrderKind::MarketBuy,
            "SOL",
            "TOKEN",
            Decimal::ONE,
            Decimal::ONE,
        );
        assert!(!trigger_crossed(&order, Decimal::ZERO));
    }
}
