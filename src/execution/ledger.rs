use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{ExecutionOutcome, OrderKind, OrderStatus, TradeOrder};
use crate::store::Store;

/// Authoritative in-memory index of all non-terminal orders, mirrored to the
/// store. Owns the state-transition guard: every mutation takes the write
/// lock, persists the updated record, and only then commits it in memory, so
/// a store failure rolls back cleanly and the two views never diverge.
///
/// `try_begin_execution` is the mutual-exclusion primitive the whole engine
/// leans on — it flips Pending to Executing exactly once per order id no
/// matter how many monitors race on it.
pub struct OrderLedger {
    orders: RwLock<HashMap<Uuid, TradeOrder>>,
    /// Terminal outcomes whose persist failed. The venue already filled, so
    /// the outcome is held here until a retry lands it in the store.
    unsaved_outcomes: Mutex<HashMap<Uuid, ExecutionOutcome>>,
    store: Arc<dyn Store>,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            unsaved_outcomes: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Re-populate from the store at startup.
    pub async fn restore(&self, orders: Vec<TradeOrder>) {
        let mut map = self.orders.write().await;
        for order in orders {
            map.insert(order.id, order);
        }
        tracing::info!(count = map.len(), "Ledger restored from store");
    }

    /// Admit a new order. Persisted before it becomes visible to monitors.
    pub async fn admit(&self, order: TradeOrder) -> Result<Uuid, EngineError> {
        if order.status != OrderStatus::Pending {
            return Err(EngineError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Pending,
            });
        }

        let id = order.id;
        self.store.save_order(&order).await?;
        self.orders.write().await.insert(id, order);
        tracing::debug!(order_id = %id, "Order admitted");
        Ok(id)
    }

    /// Atomic Pending -> Executing. Returns false when the order is missing
    /// or not Pending (someone else claimed it, or it already resolved).
    /// An Err means the store rejected the write and nothing changed.
    pub async fn try_begin_execution(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != OrderStatus::Pending {
            return Ok(false);
        }

        let mut updated = order.clone();
        updated.status = OrderStatus::Executing;
        updated.updated_at = Utc::now();

        self.store.save_order(&updated).await?;
        *order = updated;
        Ok(true)
    }

    /// Executing -> Completed | Failed. Idempotent: finalizing an order that
    /// is already terminal logs a warning and changes nothing.
    pub async fn finalize(&self, id: Uuid, outcome: ExecutionOutcome) -> Result<(), EngineError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            // Terminal orders leave the working set on their first finalize,
            // so a repeat lands here: warn and do nothing.
            tracing::warn!(order_id = %id, "finalize called on unknown or archived order; ignoring");
            return Ok(());
        };

        if order.status.is_terminal() {
            tracing::warn!(
                order_id = %id,
                status = %order.status,
                "finalize called on already-terminal order; ignoring"
            );
            return Ok(());
        }

        let to = match &outcome {
            ExecutionOutcome::Completed { .. } => OrderStatus::Completed,
            ExecutionOutcome::Failed { .. } => OrderStatus::Failed,
        };
        if !order.status.can_transition(to) {
            return Err(EngineError::InvalidTransition {
                from: order.status,
                to,
            });
        }

        let mut updated = order.clone();
        let now = Utc::now();
        updated.status = to;
        updated.updated_at = now;
        updated.completed_at = Some(now);
        match &outcome {
            ExecutionOutcome::Completed {
                realized_amount,
                venue_ref,
                entry_price,
            } => {
                updated.realized_amount = Some(*realized_amount);
                updated.venue_ref = Some(venue_ref.clone());
                updated.entry_price = *entry_price;
            }
            ExecutionOutcome::Failed { error } => {
                updated.error_message = Some(error.clone());
            }
        }

        if let Err(e) = self.store.save_order(&updated).await {
            // The fill already happened at the venue. Hold the outcome so a
            // monitor tick can re-drive the persist once the store recovers;
            // the order stays Executing and unclaimable meanwhile.
            tracing::error!(
                order_id = %id,
                error = %e,
                "Failed to persist outcome; will retry on a later tick"
            );
            self.unsaved_outcomes.lock().await.insert(id, outcome);
            return Err(e.into());
        }

        // Completed buys under stop-loss watch stay resident; everything
        // else terminal leaves the working set and is archived.
        if updated.needs_stop_loss_watch() {
            *order = updated;
        } else {
            orders.remove(&id);
            if let Err(e) = self.store.archive_order(id).await {
                tracing::warn!(order_id = %id, error = %e, "Failed to archive finalized order");
            }
        }
        Ok(())
    }

    /// Re-attempt finalizations whose persist failed. Called at the top of
    /// monitor ticks so a store outage heals without losing fills. Outcomes
    /// that fail again go back into the holding map.
    pub async fn retry_unsaved_outcomes(&self) {
        let stalled: Vec<(Uuid, ExecutionOutcome)> = {
            let mut map = self.unsaved_outcomes.lock().await;
            map.drain().collect()
        };
        for (id, outcome) in stalled {
            match self.finalize(id, outcome).await {
                Ok(()) => tracing::info!(order_id = %id, "Stalled outcome persisted"),
                Err(e) => {
                    tracing::warn!(order_id = %id, error = %e, "Outcome persist retry failed")
                }
            }
        }
    }

    /// Fail orders restored in the Executing state. Their venue outcome was
    /// lost with the previous process, so they are driven to a terminal
    /// state and the user is told, rather than sitting unclaimable forever.
    pub async fn fail_interrupted(&self) {
        let interrupted: Vec<Uuid> = self
            .snapshot(|o| o.status == OrderStatus::Executing)
            .await
            .into_iter()
            .map(|o| o.id)
            .collect();
        for id in interrupted {
            tracing::warn!(order_id = %id, "Executing order survived a restart; failing it");
            let outcome = ExecutionOutcome::Failed {
                error: "execution interrupted by restart; venue outcome unknown".into(),
            };
            if let Err(e) = self.finalize(id, outcome).await {
                tracing::warn!(order_id = %id, error = %e, "Failed to fail interrupted order");
            }
        }
    }

    /// Pending -> Cancelled, user-initiated. Once `try_begin_execution` has
    /// claimed the order, cancellation is rejected rather than raced.
    pub async fn cancel(&self, id: Uuid) -> Result<(), EngineError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Err(EngineError::OrderNotFound(id));
        };
        if order.status != OrderStatus::Pending {
            return Err(EngineError::CancelRejected {
                id,
                status: order.status,
            });
        }

        let mut updated = order.clone();
        updated.status = OrderStatus::Cancelled;
        updated.updated_at = Utc::now();

        self.store.save_order(&updated).await?;
        orders.remove(&id);
        if let Err(e) = self.store.archive_order(id).await {
            tracing::warn!(order_id = %id, error = %e, "Failed to archive cancelled order");
        }
        tracing::info!(order_id = %id, "Order cancelled");
        Ok(())
    }

    /// Sweep Pending orders past their expiry to Expired. An order whose
    /// persist fails stays Pending and is retried on the next sweep.
    pub async fn expire_older_than(&self, now: DateTime<Utc>) -> Vec<TradeOrder> {
        let mut orders = self.orders.write().await;
        let expired_ids: Vec<Uuid> = orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.is_expired(now))
            .map(|o| o.id)
            .collect();

        let mut expired = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            let Some(order) = orders.get(&id) else { continue };
            let mut updated = order.clone();
            updated.status = OrderStatus::Expired;
            updated.updated_at = now;

            if let Err(e) = self.store.save_order(&updated).await {
                tracing::warn!(order_id = %id, error = %e, "Failed to persist expiry; will retry");
                continue;
            }
            orders.remove(&id);
            if let Err(e) = self.store.archive_order(id).await {
                tracing::warn!(order_id = %id, error = %e, "Failed to archive expired order");
            }
            tracing::info!(order_id = %id, "Order expired");
            expired.push(updated);
        }
        expired
    }

    /// Flag a completed order's stop-loss as triggered. Returns false when
    /// it was already triggered (or isn't watchable), so the forced sell
    /// fires at most once even when ticks overlap. The originating order is
    /// archived here; the synthesized sell lives its own lifecycle.
    pub async fn mark_stop_loss_triggered(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        if !order.needs_stop_loss_watch() {
            return Ok(false);
        }

        let mut updated = order.clone();
        updated.stop_loss_triggered = true;
        updated.updated_at = Utc::now();

        self.store.save_order(&updated).await?;
        orders.remove(&id);
        if let Err(e) = self.store.archive_order(id).await {
            tracing::warn!(order_id = %id, error = %e, "Failed to archive stop-loss order");
        }
        Ok(true)
    }

    // -- snapshot reads (monitors iterate a copy, never the live map) ------

    pub async fn get(&self, id: Uuid) -> Option<TradeOrder> {
        self.orders.read().await.get(&id).cloned()
    }

    pub async fn pending_limit_orders(&self) -> Vec<TradeOrder> {
        self.snapshot(|o| o.status == OrderStatus::Pending && o.kind.is_limit())
            .await
    }

    pub async fn pending_snipe_orders(&self) -> Vec<TradeOrder> {
        self.snapshot(|o| o.status == OrderStatus::Pending && o.kind == OrderKind::Snipe)
            .await
    }

    pub async fn stop_loss_watchlist(&self) -> Vec<TradeOrder> {
        self.snapshot(TradeOrder::needs_stop_loss_watch).await
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Vec<TradeOrder> {
        self.snapshot(|o| o.user_id == user_id).await
    }

    async fn snapshot(&self, pred: impl Fn(&TradeOrder) -> bool) -> Vec<TradeOrder> {
        self.orders
            .read()
            .await
            .values()
            .filter(|o| pred(o))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderKind;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn limit_buy() -> TradeOrder {
        TradeOrder::new(
            7,
            OrderKind::LimitBuy,
            "SOL",
            "TOKEN",
            Decimal::ONE,
            Decimal::new(5, 1),
        )
        .with_trigger(Decimal::from(10), None)
    }

    fn completed_outcome() -> ExecutionOutcome {
        ExecutionOutcome::Completed {
            realized_amount: Decimal::from(100),
            venue_ref: "sig123".into(),
            entry_price: Some(Decimal::new(1, 2)),
        }
    }

    /// Store whose writes can be switched off, for rollback tests.
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::Relaxed) {
                Err(StoreError::Unavailable("injected failure".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
        async fn save_order(&self, order: &TradeOrder) -> Result<(), StoreError> {
            self.check()?;
            self.inner.save_order(order).await
        }
        async fn load_open_orders(&self) -> Result<Vec<TradeOrder>, StoreError> {
            self.inner.load_open_orders().await
        }
        async fn archive_order(&self, id: Uuid) -> Result<(), StoreError> {
            self.check()?;
            self.inner.archive_order(id).await
        }
        async fn get_account(
            &self,
            user_id: i64,
        ) -> Result<Option<crate::models::AccountProfile>, StoreError> {
            self.inner.get_account(user_id).await
        }
        async fn save_subscription(
            &self,
            sub: &crate::models::CopySubscription,
        ) -> Result<(), StoreError> {
            self.inner.save_subscription(sub).await
        }
        async fn get_subscription(
            &self,
            subscriber_id: i64,
            source_wallet: &str,
        ) -> Result<Option<crate::models::CopySubscription>, StoreError> {
            self.inner.get_subscription(subscriber_id, source_wallet).await
        }
        async fn load_active_subscriptions(
            &self,
        ) -> Result<Vec<crate::models::CopySubscription>, StoreError> {
            self.inner.load_active_subscriptions().await
        }
        async fn save_allocation(
            &self,
            alloc: &crate::models::SnipeAllocation,
        ) -> Result<(), StoreError> {
            self.inner.save_allocation(alloc).await
        }
        async fn load_active_allocations(
            &self,
        ) -> Result<Vec<crate::models::SnipeAllocation>, StoreError> {
            self.inner.load_active_allocations().await
        }
        async fn is_trade_relayed(&self, tx_ref: &str) -> Result<bool, StoreError> {
            self.inner.is_trade_relayed(tx_ref).await
        }
        async fn mark_trade_relayed(&self, tx_ref: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.mark_trade_relayed(tx_ref).await
        }
        async fn record_fee(
            &self,
            user_id: i64,
            fee_amount: Decimal,
            trade_ref: &str,
        ) -> Result<(), StoreError> {
            self.inner.record_fee(user_id, fee_amount, trade_ref).await
        }
    }

    #[tokio::test]
    async fn test_begin_execution_claims_once() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        let id = ledger.admit(limit_buy()).await.unwrap();

        assert!(ledger.try_begin_execution(id).await.unwrap());
        assert!(!ledger.try_begin_execution(id).await.unwrap());
        assert_eq!(ledger.get(id).await.unwrap().status, OrderStatus::Executing);
    }

    #[tokio::test]
    async fn test_begin_execution_concurrent_single_winner() {
        let ledger = Arc::new(OrderLedger::new(Arc::new(MemoryStore::new())));
        let id = ledger.admit(limit_buy()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(
                async move { ledger.try_begin_execution(id).await },
            ));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1, "exactly one caller may claim the transition");
    }

    #[tokio::test]
    async fn test_begin_execution_missing_order() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        assert!(!ledger.try_begin_execution(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_finalize_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ledger = OrderLedger::new(store.clone());
        let id = ledger.admit(limit_buy()).await.unwrap();
        ledger.try_begin_execution(id).await.unwrap();

        ledger.finalize(id, completed_outcome()).await.unwrap();
        // Second finalize on a terminal order is a warned no-op.
        ledger
            .finalize(
                id,
                ExecutionOutcome::Failed {
                    error: "late".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            store.archived_order(id).unwrap().status,
            OrderStatus::Completed,
            "late failure must not overwrite the completed outcome"
        );
    }

    #[tokio::test]
    async fn test_finalize_watched_order_stays_and_is_idempotent() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        let order = limit_buy().with_risk(Some(Decimal::from(15)), None);
        let id = ledger.admit(order).await.unwrap();
        ledger.try_begin_execution(id).await.unwrap();
        ledger.finalize(id, completed_outcome()).await.unwrap();

        // Still resident for the stop-loss monitor
        assert_eq!(ledger.stop_loss_watchlist().await.len(), 1);

        // Double finalize is a no-op, not an error
        ledger.finalize(id, completed_outcome()).await.unwrap();
        assert_eq!(ledger.get(id).await.unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_pending_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let ledger = OrderLedger::new(store.clone());
        let id = ledger.admit(limit_buy()).await.unwrap();

        ledger.cancel(id).await.unwrap();
        assert!(ledger.get(id).await.is_none());
        assert_eq!(
            store.archived_order(id).unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_executing_rejected() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        let id = ledger.admit(limit_buy()).await.unwrap();
        ledger.try_begin_execution(id).await.unwrap();

        let err = ledger.cancel(id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::CancelRejected {
                status: OrderStatus::Executing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back_claim() {
        let store = Arc::new(FlakyStore::new());
        let ledger = OrderLedger::new(store.clone());
        let id = ledger.admit(limit_buy()).await.unwrap();

        store.fail_writes.store(true, Ordering::Relaxed);
        let err = ledger.try_begin_execution(id).await;
        assert!(matches!(err, Err(EngineError::Persistence(_))));

        // In-memory state rolled back: the order is still Pending and a
        // later caller can claim it once the store recovers.
        assert_eq!(ledger.get(id).await.unwrap().status, OrderStatus::Pending);
        store.fail_writes.store(false, Ordering::Relaxed);
        assert!(ledger.try_begin_execution(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsaved_outcome_survives_store_outage() {
        let store = Arc::new(FlakyStore::new());
        let ledger = OrderLedger::new(store.clone());
        let id = ledger.admit(limit_buy()).await.unwrap();
        assert!(ledger.try_begin_execution(id).await.unwrap());

        store.fail_writes.store(true, Ordering::Relaxed);
        let err = ledger.finalize(id, completed_outcome()).await;
        assert!(matches!(err, Err(EngineError::Persistence(_))));
        assert_eq!(ledger.get(id).await.unwrap().status, OrderStatus::Executing);

        // Store still down: the outcome is held for the next pass.
        ledger.retry_unsaved_outcomes().await;
        assert_eq!(ledger.get(id).await.unwrap().status, OrderStatus::Executing);

        store.fail_writes.store(false, Ordering::Relaxed);
        ledger.retry_unsaved_outcomes().await;

        let archived = store.inner.archived_order(id).unwrap();
        assert_eq!(archived.status, OrderStatus::Completed);
        assert_eq!(archived.realized_amount, Some(Decimal::from(100)));
        assert!(ledger.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_restored_executing_orders_are_failed() {
        let store = Arc::new(MemoryStore::new());
        let id = {
            let ledger = OrderLedger::new(store.clone());
            let id = ledger.admit(limit_buy()).await.unwrap();
            assert!(ledger.try_begin_execution(id).await.unwrap());
            id
        };

        // A new process reloads the order but the venue outcome is gone.
        let ledger = OrderLedger::new(store.clone());
        ledger.restore(store.load_open_orders().await.unwrap()).await;
        ledger.fail_interrupted().await;

        let archived = store.archived_order(id).unwrap();
        assert_eq!(archived.status, OrderStatus::Failed);
        assert!(archived.error_message.is_some());
        assert!(ledger.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_expiry_sweep() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        let now = Utc::now();

        let stale = limit_buy()
            .with_trigger(Decimal::from(10), Some(now - chrono::Duration::minutes(1)));
        let fresh = limit_buy()
            .with_trigger(Decimal::from(10), Some(now + chrono::Duration::minutes(5)));
        let stale_id = ledger.admit(stale).await.unwrap();
        let fresh_id = ledger.admit(fresh).await.unwrap();

        let expired = ledger.expire_older_than(now).await;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, stale_id);
        assert!(ledger.get(stale_id).await.is_none());
        assert_eq!(
            ledger.get(fresh_id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_stop_loss_flag_fires_once() {
        let ledger = OrderLedger::new(Arc::new(MemoryStore::new()));
        let order = limit_buy().with_risk(Some(Decimal::from(15)), None);
        let id = ledger.admit(order).await.unwrap();
        ledger.try_begin_execution(id).await.unwrap();
        ledger.finalize(id, completed_outcome()).await.unwrap();

        assert!(ledger.mark_stop_loss_triggered(id).await.unwrap());
        assert!(!ledger.mark_stop_loss_triggered(id).await.unwrap());
        assert!(ledger.stop_loss_watchlist().await.is_empty());
    }
}
