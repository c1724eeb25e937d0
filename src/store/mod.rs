pub mod memory;

pub use memory::{FeeRecord, MemoryStore};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccountProfile, CopySubscription, SnipeAllocation, TradeOrder};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The durable record store, seen from the engine's side of the boundary.
///
/// Writes are considered durable once a call returns Ok; the ledger and
/// registries persist *before* committing any in-memory transition and roll
/// back when a call fails. The store's own implementation (and its
/// consistency machinery) lives outside this crate — `MemoryStore` exists
/// for tests and for running without external storage configured.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    // Orders
    async fn save_order(&self, order: &TradeOrder) -> Result<(), StoreError>;
    /// Orders the engine must keep in memory across a restart: Pending,
    /// Executing, and completed buys still under stop-loss watch.
    async fn load_open_orders(&self) -> Result<Vec<TradeOrder>, StoreError>;
    async fn archive_order(&self, id: Uuid) -> Result<(), StoreError>;

    // Accounts
    async fn get_account(&self, user_id: i64) -> Result<Option<AccountProfile>, StoreError>;

    // Copy subscriptions
    async fn save_subscription(&self, sub: &CopySubscription) -> Result<(), StoreError>;
    /// Latest record for a (subscriber, wallet) pair, active or not.
    async fn get_subscription(
        &self,
        subscriber_id: i64,
        source_wallet: &str,
    ) -> Result<Option<CopySubscription>, StoreError>;
    async fn load_active_subscriptions(&self) -> Result<Vec<CopySubscription>, StoreError>;

    // Snipe allocations
    async fn save_allocation(&self, alloc: &SnipeAllocation) -> Result<(), StoreError>;
    async fn load_active_allocations(&self) -> Result<Vec<SnipeAllocation>, StoreError>;

    // Copy-relay dedup
    async fn is_trade_relayed(&self, tx_ref: &str) -> Result<bool, StoreError>;
    async fn mark_trade_relayed(&self, tx_ref: &str) -> Result<(), StoreError>;

    // Fee bookkeeping (best-effort collaborator writes its records here)
    async fn record_fee(
        &self,
        user_id: i64,
        fee_amount: Decimal,
        trade_ref: &str,
    ) -> Result<(), StoreError>;
}
