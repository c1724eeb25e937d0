use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::clients::PriceOracle;
use crate::errors::EngineError;
use crate::execution::{MarketExecutor, OrderLedger};
use crate::models::{
    ExecutionOutcome, OrderKind, SnipeAllocation, SnipeExecution, TradeOrder,
};
use crate::registry::AllocationBook;
use crate::services::notifier::{AlertEvent, AlertSink};

/// Probes not-yet-tradable assets and buys in increments once the oracle
/// starts quoting them. Covers both snipe allocations (budgeted incremental
/// buying) and standalone snipe orders waiting for liquidity.
pub struct SnipeMonitor {
    ledger: Arc<OrderLedger>,
    allocations: Arc<AllocationBook>,
    executor: Arc<MarketExecutor>,
    oracle: Arc<dyn PriceOracle>,
    alerts: Arc<dyn AlertSink>,
    base_asset: String,
    /// Fraction of an allocation's budget bought per tick.
    increment_fraction: Decimal,
    min_viable_amount: Decimal,
    tick_interval: Duration,
}

impl SnipeMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<OrderLedger>,
        allocations: Arc<AllocationBook>,
        executor: Arc<MarketExecutor>,
        oracle: Arc<dyn PriceOracle>,
        alerts: Arc<dyn AlertSink>,
        base_asset: String,
        increment_fraction: Decimal,
        min_viable_amount: Decimal,
        tick_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            allocations,
            executor,
            oracle,
            alerts,
            base_asset,
            increment_fraction,
            min_viable_amount,
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
        self.tick_orders().await;
        self.tick_allocations().await;
    }

    /// Standalone snipe orders: execute as soon as the asset is quotable.
    async fn tick_orders(&self) {
        for order in self.ledger.pending_snipe_orders().await {
            if !self.is_tradable(&order.output_asset).await {
                continue;
            }
            tracing::info!(
                order_id = %order.id,
                asset = %order.output_asset,
                "Snipe target is tradable, executing"
            );
            match self.executor.execute(order.id).await {
                Ok(_) => {}
                Err(EngineError::AlreadyClaimed(id)) => {
                    tracing::debug!(order_id = %id, "Snipe order claimed elsewhere");
                }
                Err(e) => {
                    tracing::error!(order_id = %order.id, error = %e, "Snipe execution failed");
                }
            }
        }
    }

    async fn tick_allocations(&self) {
        for alloc in self.allocations.active_snapshot().await {
            if !self.is_tradable(&alloc.target_asset).await {
                continue;
            }
            let Some(increment) =
                alloc.next_increment(self.increment_fraction, self.min_viable_amount)
            else {
                continue;
            };

            if let Err(e) = self.buy_increment(&alloc, increment).await {
                tracing::error!(
                    allocation_id = %alloc.id,
                    error = %e,
                    "Snipe increment failed"
                );
            }
        }
    }

    async fn buy_increment(
        &self,
        alloc: &SnipeAllocation,
        increment: Decimal,
    ) -> Result<(), EngineError> {
        let order = TradeOrder::new(
            alloc.user_id,
            OrderKind::MarketBuy,
            self.base_asset.clone(),
            alloc.target_asset.clone(),
            increment,
            alloc.slippage_pct,
        )
        .with_risk(alloc.stop_loss_pct, alloc.take_profit_pct);

        let order_id = self.ledger.admit(order).await?;
        let outcome = self.executor.execute(order_id).await?;

        // Spent only advances on a confirmed fill; a failed child buy leaves
        // the budget intact for the next tick.
        if let ExecutionOutcome::Completed { venue_ref, .. } = outcome {
            self.allocations
                .record_execution(
                    alloc.id,
                    SnipeExecution {
                        order_id,
                        amount: increment,
                        venue_ref: venue_ref.clone(),
                        executed_at: Utc::now(),
                    },
                )
                .await?;

            counter!("snipe_trades_executed").increment(1);
            tracing::info!(
                allocation_id = %alloc.id,
                asset = %alloc.target_asset,
                amount = %increment,
                "Snipe increment bought"
            );

            self.alerts
                .notify(
                    alloc.user_id,
                    AlertEvent::SnipeExecuted {
                        allocation_id: alloc.id,
                        asset: alloc.target_asset.clone(),
                        amount: increment,
                        venue_ref,
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn is_tradable(&self, asset: &str) -> bool {
        match self.oracle.get_price(asset).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(asset, error = %e, "Snipe probe failed");
                false
            }
        }
    }
}
