use chrono::{Duration as ChronoDuration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::clients::WalletActivityClient;
use crate::errors::EngineError;
use crate::execution::{MarketExecutor, OrderLedger};
use crate::models::{
    CopySubscription, ExecutionOutcome, OrderKind, SourceTrade, TradeDirection, TradeOrder,
};
use crate::registry::SubscriptionBook;
use crate::services::notifier::{AlertEvent, AlertSink};
use crate::store::Store;

/// Tuning knobs for which observed trades are worth mirroring.
#[derive(Debug, Clone)]
pub struct RelayFilter {
    /// Trades older than this are stale and never relayed.
    pub recency_window: ChronoDuration,
    /// Significance floor in base-asset units.
    pub min_amount: Decimal,
    /// Significance floor in USD; either floor passing qualifies the trade.
    pub min_amount_usd: Decimal,
    pub trades_per_wallet: usize,
}

impl Default for RelayFilter {
    fn default() -> Self {
        Self {
            recency_window: ChronoDuration::minutes(5),
            min_amount: Decimal::new(1, 1),      // 0.1
            min_amount_usd: Decimal::from(100),
            trades_per_wallet: 5,
        }
    }
}

/// Polls watched source wallets and mirrors their significant trades onto
/// every subscriber.
///
/// Each source transaction is claimed in the store before any subscriber
/// order goes out, so a trade fans out at most once even across restarts or
/// overlapping ticks. A failed mirror for one subscriber never blocks the
/// others, and a subscriber's copy delay runs on its own task so it never
/// stalls the rest of the tick.
pub struct CopyRelay {
    ledger: Arc<OrderLedger>,
    subscriptions: Arc<SubscriptionBook>,
    executor: Arc<MarketExecutor>,
    activity: Arc<dyn WalletActivityClient>,
    store: Arc<dyn Store>,
    alerts: Arc<dyn AlertSink>,
    base_asset: String,
    min_viable_amount: Decimal,
    filter: RelayFilter,
    tick_interval: Duration,
}

impl CopyRelay {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<OrderLedger>,
        subscriptions: Arc<SubscriptionBook>,
        executor: Arc<MarketExecutor>,
        activity: Arc<dyn WalletActivityClient>,
        store: Arc<dyn Store>,
        alerts: Arc<dyn AlertSink>,
        base_asset: String,
        min_viable_amount: Decimal,
        filter: RelayFilter,
        tick_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            subscriptions,
            executor,
            activity,
            store,
            alerts,
            base_asset,
            min_viable_amount,
            filter,
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
        for wallet in self.subscriptions.watched_wallets().await {
            let trades = match self
                .activity
                .recent_trades(&wallet, self.filter.trades_per_wallet)
                .await
            {
                Ok(trades) => trades,
                Err(e) => {
                    tracing::warn!(wallet = %wallet, error = %e, "Wallet activity fetch failed");
                    continue;
                }
            };

            for trade in trades {
                if let Err(e) = self.relay_trade(&trade).await {
                    tracing::error!(
                        wallet = %wallet,
                        tx_ref = %trade.tx_ref,
                        error = %e,
                        "Relay failed for source trade"
                    );
                }
            }
        }
    }

    async fn relay_trade(&self, trade: &SourceTrade) -> Result<(), EngineError> {
        if !is_significant(&self.filter, trade, Utc::now()) {
            return Ok(());
        }

        // Claim the transaction before fanning out. If the claim itself
        // fails, nothing was sent and the next tick retries.
        if self.store.is_trade_relayed(&trade.tx_ref).await? {
            return Ok(());
        }
        self.store.mark_trade_relayed(&trade.tx_ref).await?;

        let subscribers = self.subscriptions.subscribers_of(&trade.wallet).await;
        if subscribers.is_empty() {
            return Ok(());
        }

        tracing::info!(
            wallet = %trade.wallet,
            tx_ref = %trade.tx_ref,
            direction = %trade.direction,
            amount = %trade.amount,
            subscribers = subscribers.len(),
            "Relaying source trade"
        );

        for sub in subscribers {
            if let Err(e) = self.mirror_for(&sub, trade).await {
                tracing::warn!(
                    subscriber = sub.subscriber_id,
                    wallet = %trade.wallet,
                    error = %e,
                    "Mirror failed for subscriber"
                );
            }
        }
        Ok(())
    }

    async fn mirror_for(
        &self,
        sub: &CopySubscription,
        trade: &SourceTrade,
    ) -> Result<(), EngineError> {
        let Some(amount) = sub.scaled_amount(trade.amount) else {
            return Ok(());
        };
        if amount < self.min_viable_amount {
            tracing::debug!(
                subscriber = sub.subscriber_id,
                amount = %amount,
                "Scaled copy below viable minimum, skipping"
            );
            return Ok(());
        }

        let order = match self.mirrored_order(sub, trade, amount) {
            Some(order) => order,
            None => return Ok(()),
        };

        if sub.copy_delay_secs > 0 {
            let ledger = self.ledger.clone();
            let executor = self.executor.clone();
            let subscriptions = self.subscriptions.clone();
            let alerts = self.alerts.clone();
            let subscriber_id = sub.subscriber_id;
            let source_wallet = trade.wallet.clone();
            let direction = trade.direction;
            let delay = Duration::from_secs(sub.copy_delay_secs);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = place_mirror(
                    ledger,
                    executor,
                    subscriptions,
                    alerts,
                    order,
                    subscriber_id,
                    source_wallet,
                    direction,
                    amount,
                )
                .await
                {
                    tracing::warn!(
                        subscriber = subscriber_id,
                        error = %e,
                        "Delayed mirror failed"
                    );
                }
            });
            return Ok(());
        }

        place_mirror(
            self.ledger.clone(),
            self.executor.clone(),
            self.subscriptions.clone(),
            self.alerts.clone(),
            order,
            sub.subscriber_id,
            trade.wallet.clone(),
            trade.direction,
            amount,
        )
        .await
    }

    /// Translate a source trade into the subscriber's own order. Swaps are
    /// treated as buys when they spend the base asset, sells otherwise.
    fn mirrored_order(
        &self,
        sub: &CopySubscription,
        trade: &SourceTrade,
        amount: Decimal,
    ) -> Option<TradeOrder> {
        let is_buy = match trade.direction {
            TradeDirection::Buy => true,
            TradeDirection::Sell => false,
            TradeDirection::Swap => trade.input_asset == self.base_asset,
        };

        let (kind, input, output) = if is_buy {
            (
                OrderKind::MarketBuy,
                self.base_asset.clone(),
                trade.output_asset.clone(),
            )
        } else {
            (
                OrderKind::MarketSell,
                trade.input_asset.clone(),
                self.base_asset.clone(),
            )
        };

        if input == output {
            tracing::debug!(tx_ref = %trade.tx_ref, "Degenerate mirror pair, skipping");
            return None;
        }

        Some(TradeOrder::new(
            sub.subscriber_id,
            kind,
            input,
            output,
            amount,
            Decimal::ONE, // venue default slippage for mirrored trades
        ))
    }
}

/// Admit and execute one subscriber's mirrored order, updating their copy
/// stats on a confirmed fill. Free-standing so delayed mirrors can run it
/// from their own task.
#[allow(clippy::too_many_arguments)]
async fn place_mirror(
    ledger: Arc<OrderLedger>,
    executor: Arc<MarketExecutor>,
    subscriptions: Arc<SubscriptionBook>,
    alerts: Arc<dyn AlertSink>,
    order: TradeOrder,
    subscriber_id: i64,
    source_wallet: String,
    direction: TradeDirection,
    amount: Decimal,
) -> Result<(), EngineError> {
    let order_id = ledger.admit(order).await?;
    let outcome = executor.execute(order_id).await?;

    if let ExecutionOutcome::Completed { venue_ref, .. } = outcome {
        subscriptions
            .record_copy(subscriber_id, &source_wallet, amount)
            .await?;
        counter!("copy_trades_relayed").increment(1);

        alerts
            .notify(
                subscriber_id,
                AlertEvent::CopyTradeExecuted {
                    source_wallet,
                    direction,
                    amount,
                    venue_ref,
                },
            )
            .await;
    }
    Ok(())
}

/// A trade is relayed only when fresh and large enough to matter, by base
/// units or by notional value.
fn is_significant(
    filter: &RelayFilter,
    trade: &SourceTrade,
    now: chrono::DateTime<Utc>,
) -> bool {
    if now - trade.observed_at > filter.recency_window {
        return false;
    }
    trade.amount >= filter.min_amount || trade.amount_usd >= filter.min_amount_usd
}
