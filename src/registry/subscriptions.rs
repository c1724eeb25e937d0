use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::EngineError;
use crate::models::{CopySettings, CopySubscription};
use crate::store::Store;

/// Active copy-trading subscriptions, keyed by (subscriber, source wallet).
/// Same discipline as the order ledger: persist first, commit in memory
/// after, snapshot reads for the relay.
pub struct SubscriptionBook {
    subs: RwLock<HashMap<(i64, String), CopySubscription>>,
    store: Arc<dyn Store>,
}

impl SubscriptionBook {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            subs: RwLock::new(HashMap::new()),
            store,
        }
    }

    pub async fn restore(&self, subscriptions: Vec<CopySubscription>) {
        let mut subs = self.subs.write().await;
        for sub in subscriptions {
            subs.insert((sub.subscriber_id, sub.source_wallet.clone()), sub);
        }
        tracing::info!(count = subs.len(), "Copy subscriptions restored from store");
    }

    /// Create or reactivate a subscription. One active record per pair.
    pub async fn upsert(&self, sub: CopySubscription) -> Result<(), EngineError> {
        self.store.save_subscription(&sub).await?;
        self.subs
            .write()
            .await
            .insert((sub.subscriber_id, sub.source_wallet.clone()), sub);
        Ok(())
    }

    /// Soft-delete: the record survives with `is_active = false`.
    pub async fn deactivate(&self, subscriber_id: i64, wallet: &str) -> Result<(), EngineError> {
        let mut subs = self.subs.write().await;
        let key = (subscriber_id, wallet.to_string());
        let Some(sub) = subs.get(&key) else {
            return Err(EngineError::SubscriptionNotFound {
                wallet: wallet.to_string(),
            });
        };

        let mut updated = sub.clone();
        updated.is_active = false;
        self.store.save_subscription(&updated).await?;
        subs.remove(&key);
        tracing::info!(user_id = subscriber_id, wallet, "Copy subscription deactivated");
        Ok(())
    }

    pub async fn update_settings(
        &self,
        subscriber_id: i64,
        wallet: &str,
        settings: &CopySettings,
    ) -> Result<(), EngineError> {
        let mut subs = self.subs.write().await;
        let key = (subscriber_id, wallet.to_string());
        let Some(sub) = subs.get_mut(&key) else {
            return Err(EngineError::SubscriptionNotFound {
                wallet: wallet.to_string(),
            });
        };

        let mut updated = sub.clone();
        settings.apply(&mut updated);
        self.store.save_subscription(&updated).await?;
        *sub = updated;
        Ok(())
    }

    /// Distinct source wallets that have at least one active, enabled
    /// subscriber — the relay's watch set.
    pub async fn watched_wallets(&self) -> Vec<String> {
        let subs = self.subs.read().await;
        let wallets: HashSet<&str> = subs
            .values()
            .filter(|s| s.is_active && s.enabled)
            .map(|s| s.source_wallet.as_str())
            .collect();
        wallets.into_iter().map(str::to_string).collect()
    }

    pub async fn subscribers_of(&self, wallet: &str) -> Vec<CopySubscription> {
        self.subs
            .read()
            .await
            .values()
            .filter(|s| s.is_active && s.enabled && s.source_wallet == wallet)
            .cloned()
            .collect()
    }

    pub async fn for_user(&self, subscriber_id: i64) -> Vec<CopySubscription> {
        self.subs
            .read()
            .await
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .cloned()
            .collect()
    }

    /// Bump a subscriber's copy statistics after a successful mirror.
    pub async fn record_copy(
        &self,
        subscriber_id: i64,
        wallet: &str,
        volume: Decimal,
    ) -> Result<(), EngineError> {
        let mut subs = self.subs.write().await;
        let key = (subscriber_id, wallet.to_string());
        let Some(sub) = subs.get_mut(&key) else {
            return Err(EngineError::SubscriptionNotFound {
                wallet: wallet.to_string(),
            });
        };

        let mut updated = sub.clone();
        updated.record_copy(volume, Utc::now());
        self.store.save_subscription(&updated).await?;
        *sub = updated;
        Ok(())
    }
}
