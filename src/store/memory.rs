use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    AccountProfile, CopySubscription, OrderStatus, SnipeAllocation, TradeOrder,
};

use super::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct FeeRecord {
    pub user_id: i64,
    pub fee_amount: Decimal,
    pub trade_ref: String,
    pub recorded_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    orders: HashMap<Uuid, TradeOrder>,
    archived: HashMap<Uuid, TradeOrder>,
    accounts: HashMap<i64, AccountProfile>,
    subscriptions: HashMap<(i64, String), CopySubscription>,
    allocations: HashMap<Uuid, SnipeAllocation>,
    relayed: HashSet<String>,
    fees: Vec<FeeRecord>,
}

/// In-process `Store` used by the test suite and when no external store is
/// configured. Not durable; the real deployment points the engine at an
/// external store service instead.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account; intake validation rejects unknown users.
    pub fn upsert_account(&self, account: AccountProfile) {
        let mut inner = self.inner.lock().unwrap();
        inner.accounts.insert(account.user_id, account);
    }

    pub fn archived_order(&self, id: Uuid) -> Option<TradeOrder> {
        self.inner.lock().unwrap().archived.get(&id).cloned()
    }

    pub fn stored_order(&self, id: Uuid) -> Option<TradeOrder> {
        self.inner.lock().unwrap().orders.get(&id).cloned()
    }

    pub fn fees_for(&self, user_id: i64) -> Vec<FeeRecord> {
        self.inner
            .lock()
            .unwrap()
            .fees
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_order(&self, order: &TradeOrder) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn load_open_orders(&self) -> Result<Vec<TradeOrder>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .orders
            .values()
            .filter(|o| {
                matches!(o.status, OrderStatus::Pending | OrderStatus::Executing)
                    || o.needs_stop_loss_watch()
            })
            .cloned()
            .collect())
    }

    async fn archive_order(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(order) = inner.orders.remove(&id) {
            inner.archived.insert(id, order);
        }
        Ok(())
    }

    async fn get_account(&self, user_id: i64) -> Result<Option<AccountProfile>, StoreError> {
        Ok(self.inner.lock().unwrap().accounts.get(&user_id).cloned())
    }

    async fn save_subscription(&self, sub: &CopySubscription) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .subscriptions
            .insert((sub.subscriber_id, sub.source_wallet.clone()), sub.clone());
        Ok(())
    }

    async fn get_subscription(
        &self,
        subscriber_id: i64,
        source_wallet: &str,
    ) -> Result<Option<CopySubscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .get(&(subscriber_id, source_wallet.to_string()))
            .cloned())
    }

    async fn load_active_subscriptions(&self) -> Result<Vec<CopySubscription>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subscriptions
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn save_allocation(&self, alloc: &SnipeAllocation) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.allocations.insert(alloc.id, alloc.clone());
        Ok(())
    }

    async fn load_active_allocations(&self) -> Result<Vec<SnipeAllocation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .allocations
            .values()
            .filter(|a| a.status == crate::models::AllocationStatus::Active)
            .cloned()
            .collect())
    }

    async fn is_trade_relayed(&self, tx_ref: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().relayed.contains(tx_ref))
    }

    async fn mark_trade_relayed(&self, tx_ref: &str) -> Result<(), StoreError> {
        self.inner.lock().unwrap().relayed.insert(tx_ref.to_string());
        Ok(())
    }

    async fn record_fee(
        &self,
        user_id: i64,
        fee_amount: Decimal,
        trade_ref: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fees.push(FeeRecord {
            user_id,
            fee_amount,
            trade_ref: trade_ref.to_string(),
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}
