use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{AllocationStatus, SnipeAllocation, SnipeExecution};
use crate::store::Store;

/// Live snipe allocations. Budget accounting happens on the model; this
/// book guards concurrent ticks and persists every transition before
/// committing it in memory.
pub struct AllocationBook {
    allocations: RwLock<HashMap<Uuid, SnipeAllocation>>,
    store: Arc<dyn Store>,
}

impl AllocationBook {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            allocations: RwLock::new(HashMap::new()),
            store,
        }
    }

    pub async fn restore(&self, allocations: Vec<SnipeAllocation>) {
        let mut allocs = self.allocations.write().await;
        for alloc in allocations {
            allocs.insert(alloc.id, alloc);
        }
        tracing::info!(count = allocs.len(), "Snipe allocations restored from store");
    }

    pub async fn insert(&self, alloc: SnipeAllocation) -> Result<(), EngineError> {
        self.store.save_allocation(&alloc).await?;
        tracing::info!(
            allocation_id = %alloc.id,
            user_id = alloc.user_id,
            asset = %alloc.target_asset,
            budget = %alloc.max_spend,
            "Snipe allocation created"
        );
        self.allocations.write().await.insert(alloc.id, alloc);
        Ok(())
    }

    /// Cancel an active allocation owned by `user_id`. Already-spent budget
    /// stays spent; the allocation just stops producing increments.
    pub async fn cancel(&self, user_id: i64, id: Uuid) -> Result<(), EngineError> {
        let mut allocs = self.allocations.write().await;
        let Some(alloc) = allocs.get(&id).filter(|a| a.user_id == user_id) else {
            return Err(EngineError::AllocationNotFound(id));
        };

        let mut updated = alloc.clone();
        updated.status = AllocationStatus::Cancelled;
        updated.updated_at = Utc::now();
        self.store.save_allocation(&updated).await?;
        allocs.remove(&id);
        tracing::info!(allocation_id = %id, user_id, "Snipe allocation cancelled");
        Ok(())
    }

    /// Record one child buy. Budget check, append, and the Exhausted flip are
    /// persisted as a single transition; on store failure nothing commits.
    pub async fn record_execution(
        &self,
        id: Uuid,
        exec: SnipeExecution,
    ) -> Result<SnipeAllocation, EngineError> {
        let mut allocs = self.allocations.write().await;
        let Some(alloc) = allocs.get_mut(&id) else {
            return Err(EngineError::AllocationNotFound(id));
        };

        let mut updated = alloc.clone();
        updated.record_execution(exec)?;
        self.store.save_allocation(&updated).await?;

        if updated.status == AllocationStatus::Exhausted {
            tracing::info!(
                allocation_id = %id,
                spent = %updated.spent,
                "Snipe allocation exhausted"
            );
            let done = updated.clone();
            allocs.remove(&id);
            return Ok(done);
        }

        *alloc = updated.clone();
        Ok(updated)
    }

    pub async fn active_snapshot(&self) -> Vec<SnipeAllocation> {
        self.allocations
            .read()
            .await
            .values()
            .filter(|a| a.status == AllocationStatus::Active)
            .cloned()
            .collect()
    }

    pub async fn for_user(&self, user_id: i64) -> Vec<SnipeAllocation> {
        self.allocations
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }
}
