use metrics::counter;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::clients::{ExecutionClient, PriceOracle};
use crate::errors::EngineError;
use crate::execution::ledger::OrderLedger;
use crate::models::ExecutionOutcome;
use crate::services::fees::FeeCollector;
use crate::services::notifier::{AlertEvent, AlertSink};

/// The single choke point through which every order actually trades.
///
/// All monitors and the intake path funnel into `execute`, and the ledger's
/// `try_begin_execution` is the sole gate in front of the venue call, so the
/// venue is invoked at most once per order. Timeouts become Failed outcomes;
/// retry is a new order, never implicit.
pub struct MarketExecutor {
    ledger: Arc<OrderLedger>,
    execution: Arc<dyn ExecutionClient>,
    oracle: Arc<dyn PriceOracle>,
    fees: Arc<dyn FeeCollector>,
    alerts: Arc<dyn AlertSink>,
    swap_timeout: Duration,
}

impl MarketExecutor {
    pub fn new(
        ledger: Arc<OrderLedger>,
        execution: Arc<dyn ExecutionClient>,
        oracle: Arc<dyn PriceOracle>,
        fees: Arc<dyn FeeCollector>,
        alerts: Arc<dyn AlertSink>,
        swap_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            execution,
            oracle,
            fees,
            alerts,
            swap_timeout,
        }
    }

    /// Execute an admitted order now. Returns the terminal outcome, or
    /// `AlreadyClaimed` when another task holds the order's transition.
    pub async fn execute(&self, id: Uuid) -> Result<ExecutionOutcome, EngineError> {
        let Some(order) = self.ledger.get(id).await else {
            return Err(EngineError::OrderNotFound(id));
        };

        if !self.ledger.try_begin_execution(id).await? {
            return Err(EngineError::AlreadyClaimed(id));
        }

        tracing::info!(
            order_id = %id,
            kind = %order.kind,
            amount = %order.amount,
            input = %order.input_asset,
            output = %order.output_asset,
            "Executing order"
        );

        let swap = timeout(
            self.swap_timeout,
            self.execution.swap(
                &order.input_asset,
                &order.output_asset,
                order.amount,
                order.slippage_pct,
            ),
        )
        .await;

        let outcome = match swap {
            Ok(Ok(fill)) => {
                // Basis for later drawdown checks, taken from the same
                // oracle the monitors quote so both sides share a numeraire.
                let entry_price = if order.kind.is_buy() {
                    self.entry_quote(&order.output_asset).await
                } else {
                    None
                };
                ExecutionOutcome::Completed {
                    realized_amount: fill.realized_amount,
                    venue_ref: fill.venue_ref,
                    entry_price,
                }
            }
            Ok(Err(e)) => ExecutionOutcome::Failed {
                error: e.to_string(),
            },
            Err(_) => ExecutionOutcome::Failed {
                error: format!("swap timed out after {:?}", self.swap_timeout),
            },
        };

        self.ledger.finalize(id, outcome.clone()).await?;

        match &outcome {
            ExecutionOutcome::Completed {
                realized_amount,
                venue_ref,
                ..
            } => {
                counter!("orders_executed").increment(1);
                tracing::info!(
                    order_id = %id,
                    realized = %realized_amount,
                    venue_ref = %venue_ref,
                    "Order completed"
                );

                // Fee deduction is best-effort; the completed trade stands
                // either way.
                if !self
                    .fees
                    .deduct(order.user_id, order.amount, venue_ref)
                    .await
                {
                    tracing::warn!(
                        order_id = %id,
                        user_id = order.user_id,
                        "Fee deduction failed after completed trade"
                    );
                }

                let mut completed = order.clone();
                completed.realized_amount = Some(*realized_amount);
                completed.venue_ref = Some(venue_ref.clone());
                self.alerts
                    .notify(order.user_id, AlertEvent::TradeCompleted { order: completed })
                    .await;
            }
            ExecutionOutcome::Failed { error } => {
                counter!("orders_failed").increment(1);
                tracing::error!(order_id = %id, error = %error, "Order failed");

                self.alerts
                    .notify(
                        order.user_id,
                        AlertEvent::TradeFailed {
                            order: order.clone(),
                            error: error.clone(),
                        },
                    )
                    .await;
            }
        }

        Ok(outcome)
    }

    async fn entry_quote(&self, asset: &str) -> Option<rust_decimal::Decimal> {
        match self.oracle.get_price(asset).await {
            Ok(Some(quote)) => Some(quote.price),
            Ok(None) => {
                tracing::debug!(asset, "No quote at fill time; position has no basis");
                None
            }
            Err(e) => {
                tracing::debug!(asset, error = %e, "Entry quote failed; position has no basis");
                None
            }
        }
    }
}
