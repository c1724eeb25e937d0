use metrics::counter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::clients::PriceOracle;
use crate::errors::EngineError;
use crate::execution::{MarketExecutor, OrderLedger};
use crate::models::{OrderKind, TradeOrder};
use crate::services::notifier::{AlertEvent, AlertSink};
use crate::services::oracle_health::OracleHealth;

/// Watches completed buys with a stop-loss and force-sells the position
/// when drawdown from the entry price breaches the threshold.
///
/// The triggered flag is flipped and persisted before the sell order is
/// synthesized, so overlapping ticks cannot double-sell a position.
pub struct StopLossMonitor {
    ledger: Arc<OrderLedger>,
    executor: Arc<MarketExecutor>,
    oracle: Arc<dyn PriceOracle>,
    health: Arc<OracleHealth>,
    alerts: Arc<dyn AlertSink>,
    tick_interval: Duration,
}

impl StopLossMonitor {
    pub fn new(
        ledger: Arc<OrderLedger>,
        executor: Arc<MarketExecutor>,
        oracle: Arc<dyn PriceOracle>,
        health: Arc<OracleHealth>,
        alerts: Arc<dyn AlertSink>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            executor,
            oracle,
            health,
            alerts,
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
        for order in self.ledger.stop_loss_watchlist().await {
            let quote = match self.oracle.get_price(&order.output_asset).await {
                Ok(Some(q)) => {
                    self.health.record_success(&order.output_asset);
                    q
                }
                Ok(None) => {
                    self.health.record_miss(&order.output_asset);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        asset = %order.output_asset,
                        error = %e,
                        "Price check failed for watched position"
                    );
                    continue;
                }
            };

            let Some(drawdown) = drawdown_pct(&order, quote.price) else {
                continue;
            };
            let threshold = order.stop_loss_pct.unwrap_or_default();
            if drawdown < threshold {
                tracing::debug!(
                    order_id = %order.id,
                    drawdown = %drawdown,
                    threshold = %threshold,
                    "Position within stop-loss bounds"
                );
                continue;
            }

            if let Err(e) = self.force_sell(&order, quote.price, drawdown).await {
                tracing::error!(order_id = %order.id, error = %e, "Stop-loss sell failed");
            }
        }
    }

    async fn force_sell(
        &self,
        order: &TradeOrder,
        current_price: Decimal,
        drawdown: Decimal,
    ) -> Result<(), EngineError> {
        // The persisted flag is the at-most-once gate.
        if !self.ledger.mark_stop_loss_triggered(order.id).await? {
            return Ok(());
        }

        counter!("stop_losses_triggered").increment(1);
        tracing::info!(
            order_id = %order.id,
            asset = %order.output_asset,
            drawdown = %drawdown,
            price = %current_price,
            "Stop-loss triggered, selling position"
        );

        self.alerts
            .notify(
                order.user_id,
                AlertEvent::StopLossTriggered {
                    order: order.clone(),
                    current_price,
                },
            )
            .await;

        let Some(position_size) = order.realized_amount else {
            tracing::error!(order_id = %order.id, "Watched order has no realized amount");
            return Ok(());
        };

        // Sell the whole position back into the asset the buy spent.
        let sell = TradeOrder::new(
            order.user_id,
            OrderKind::MarketSell,
            order.output_asset.clone(),
            order.input_asset.clone(),
            position_size,
            order.slippage_pct,
        );
        let sell_id = self.ledger.admit(sell).await?;
        self.executor.execute(sell_id).await?;
        Ok(())
    }
}

/// Percentage decline from the entry price; None when there is no basis.
fn drawdown_pct(order: &TradeOrder, current_price: Decimal) -> Option<Decimal> {
    let entry = order.entry_price?;
    if entry <= Decimal::ZERO {
        return None;
    }
    Some((entry - current_price) / entry * Decimal::ONE_HUNDRED)
}
