use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::clients::ExecutionClient;
use crate::errors::EngineError;
use crate::execution::validator::{validate_order, OrderLimits, ValidationError};
use crate::execution::{MarketExecutor, OrderLedger};
use crate::models::{
    AccountProfile, CopySettings, CopySubscription, SnipeAllocation, TradeOrder,
};
use crate::registry::{AllocationBook, SubscriptionBook};
use crate::store::Store;

/// Front door for everything user-initiated. Validates, admits, and kicks
/// off execution; the monitors drive everything else through the same
/// ledger and executor this facade holds.
pub struct TradingEngine {
    ledger: Arc<OrderLedger>,
    subscriptions: Arc<SubscriptionBook>,
    allocations: Arc<AllocationBook>,
    executor: Arc<MarketExecutor>,
    execution: Arc<dyn ExecutionClient>,
    store: Arc<dyn Store>,
    limits: OrderLimits,
}

impl TradingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<OrderLedger>,
        subscriptions: Arc<SubscriptionBook>,
        allocations: Arc<AllocationBook>,
        executor: Arc<MarketExecutor>,
        execution: Arc<dyn ExecutionClient>,
        store: Arc<dyn Store>,
        limits: OrderLimits,
    ) -> Self {
        Self {
            ledger,
            subscriptions,
            allocations,
            executor,
            execution,
            store,
            limits,
        }
    }

    /// Reload working state from the store after a restart. Orders caught
    /// mid-execution by the previous process are failed; their venue outcome
    /// is unknowable.
    pub async fn restore(&self) -> Result<(), EngineError> {
        self.ledger.restore(self.store.load_open_orders().await?).await;
        self.ledger.fail_interrupted().await;
        self.subscriptions
            .restore(self.store.load_active_subscriptions().await?)
            .await;
        self.allocations
            .restore(self.store.load_active_allocations().await?)
            .await;
        Ok(())
    }

    async fn account(&self, user_id: i64) -> Result<AccountProfile, EngineError> {
        self.store
            .get_account(user_id)
            .await?
            .ok_or(EngineError::Validation(ValidationError::UnknownAccount(
                user_id,
            )))
    }

    // -- orders ------------------------------------------------------------

    /// Validate and admit a user order. Market orders start executing in the
    /// background immediately; conditional orders wait for their monitor.
    pub async fn submit_order(&self, order: TradeOrder) -> Result<TradeOrder, EngineError> {
        let account = self.account(order.user_id).await?;
        validate_order(&order, &account, &self.limits, self.execution.as_ref()).await?;

        let snapshot = order.clone();
        let id = self.ledger.admit(order).await?;

        if snapshot.kind.is_market() {
            let executor = self.executor.clone();
            tokio::spawn(async move {
                if let Err(e) = executor.execute(id).await {
                    tracing::error!(order_id = %id, error = %e, "Background execution failed");
                }
            });
        }
        Ok(snapshot)
    }

    /// Cancel a still-pending order. Ownership is checked before the ledger
    /// transition so one user cannot cancel another's order.
    pub async fn cancel_order(&self, user_id: i64, id: Uuid) -> Result<(), EngineError> {
        match self.ledger.get(id).await {
            Some(order) if order.user_id == user_id => self.ledger.cancel(id).await,
            _ => Err(EngineError::OrderNotFound(id)),
        }
    }

    pub async fn get_order(&self, user_id: i64, id: Uuid) -> Result<TradeOrder, EngineError> {
        match self.ledger.get(id).await {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(EngineError::OrderNotFound(id)),
        }
    }

    pub async fn list_orders(&self, user_id: i64) -> Vec<TradeOrder> {
        self.ledger.orders_for_user(user_id).await
    }

    // -- copy trading ------------------------------------------------------

    pub async fn subscribe(
        &self,
        user_id: i64,
        source_wallet: &str,
        settings: Option<CopySettings>,
    ) -> Result<CopySubscription, EngineError> {
        let account = self.account(user_id).await?;
        if !account.tier.has_advanced_trading() {
            return Err(EngineError::Validation(ValidationError::TierRequired {
                feature: "copy trading",
            }));
        }

        let valid = self
            .execution
            .validate_address(source_wallet)
            .await
            .map_err(|e| EngineError::Collaborator(e.to_string()))?;
        if !valid {
            return Err(EngineError::Validation(ValidationError::InvalidAsset(
                source_wallet.to_string(),
            )));
        }

        // Re-following a wallet revives the prior record, so accumulated
        // copy stats survive an unsubscribe.
        let mut sub = match self.store.get_subscription(user_id, source_wallet).await? {
            Some(mut existing) => {
                existing.enabled = true;
                existing.is_active = true;
                existing
            }
            None => CopySubscription::new(user_id, source_wallet),
        };
        if let Some(settings) = settings {
            settings.apply(&mut sub);
        }
        self.subscriptions.upsert(sub.clone()).await?;
        tracing::info!(user_id, wallet = source_wallet, "Copy subscription created");
        Ok(sub)
    }

    pub async fn unsubscribe(&self, user_id: i64, source_wallet: &str) -> Result<(), EngineError> {
        self.subscriptions.deactivate(user_id, source_wallet).await
    }

    pub async fn update_copy_settings(
        &self,
        user_id: i64,
        source_wallet: &str,
        settings: CopySettings,
    ) -> Result<(), EngineError> {
        self.subscriptions
            .update_settings(user_id, source_wallet, &settings)
            .await
    }

    pub async fn list_subscriptions(&self, user_id: i64) -> Vec<CopySubscription> {
        self.subscriptions.for_user(user_id).await
    }

    // -- snipe allocations -------------------------------------------------

    pub async fn create_snipe(
        &self,
        user_id: i64,
        target_asset: &str,
        max_spend: Decimal,
        slippage_pct: Decimal,
        stop_loss_pct: Option<Decimal>,
        take_profit_pct: Option<Decimal>,
    ) -> Result<SnipeAllocation, EngineError> {
        let account = self.account(user_id).await?;
        if !account.tier.has_advanced_trading() {
            return Err(EngineError::Validation(ValidationError::TierRequired {
                feature: "sniping",
            }));
        }

        if max_spend < self.limits.min_amount {
            return Err(EngineError::Validation(ValidationError::AmountTooSmall {
                amount: max_spend,
                min: self.limits.min_amount,
            }));
        }
        if max_spend > self.limits.max_amount {
            return Err(EngineError::Validation(ValidationError::AmountTooLarge {
                amount: max_spend,
                max: self.limits.max_amount,
            }));
        }
        if slippage_pct < self.limits.min_slippage_pct
            || slippage_pct > self.limits.max_slippage_pct
        {
            return Err(EngineError::Validation(
                ValidationError::SlippageOutOfRange {
                    pct: slippage_pct,
                    min: self.limits.min_slippage_pct,
                    max: self.limits.max_slippage_pct,
                },
            ));
        }

        let mut alloc = SnipeAllocation::new(user_id, target_asset, max_spend, slippage_pct);
        alloc.stop_loss_pct = stop_loss_pct;
        alloc.take_profit_pct = take_profit_pct;
        self.allocations.insert(alloc.clone()).await?;
        Ok(alloc)
    }

    pub async fn cancel_snipe(&self, user_id: i64, id: Uuid) -> Result<(), EngineError> {
        self.allocations.cancel(user_id, id).await
    }

    pub async fn list_snipes(&self, user_id: i64) -> Vec<SnipeAllocation> {
        self.allocations.for_user(user_id).await
    }
}
