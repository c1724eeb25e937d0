use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Active,
    Exhausted,
    Cancelled,
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationStatus::Active => "active",
            AllocationStatus::Exhausted => "exhausted",
            AllocationStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("allocation {id} is {status}, not active")]
    NotActive { id: Uuid, status: AllocationStatus },

    #[error("increment {amount} would push spent past budget {max_spend} (spent {spent})")]
    BudgetExceeded {
        amount: Decimal,
        spent: Decimal,
        max_spend: Decimal,
    },
}

/// One successful child buy under an allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeExecution {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub venue_ref: String,
    pub executed_at: DateTime<Utc>,
}

/// A bounded speculative buying budget for a not-yet-tradable asset.
///
/// `spent` only ever moves together with an append to `executed`, and never
/// past `max_spend`; the registry persists both as a single transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeAllocation {
    pub id: Uuid,
    pub user_id: i64,
    pub target_asset: String,
    pub max_spend: Decimal,
    pub spent: Decimal,
    pub slippage_pct: Decimal,
    pub stop_loss_pct: Option<Decimal>,
    pub take_profit_pct: Option<Decimal>,
    pub status: AllocationStatus,
    pub executed: Vec<SnipeExecution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SnipeAllocation {
    pub fn new(
        user_id: i64,
        target_asset: impl Into<String>,
        max_spend: Decimal,
        slippage_pct: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            target_asset: target_asset.into(),
            max_spend,
            spent: Decimal::ZERO,
            slippage_pct,
            stop_loss_pct: None,
            take_profit_pct: None,
            status: AllocationStatus::Active,
            executed: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.max_spend - self.spent
    }

    /// Size of the next child buy: the remaining budget, capped at
    /// `fraction` of the total budget per trade. Returns None once the
    /// viable increment drops below `min_viable`.
    pub fn next_increment(&self, fraction: Decimal, min_viable: Decimal) -> Option<Decimal> {
        if self.status != AllocationStatus::Active {
            return None;
        }
        let increment = self.remaining().min(self.max_spend * fraction);
        if increment < min_viable {
            None
        } else {
            Some(increment)
        }
    }

    /// Append a child execution and advance `spent`, flipping to Exhausted
    /// when the budget is used up. The budget bound is re-checked here so no
    /// caller can push `spent` past `max_spend`.
    pub fn record_execution(&mut self, exec: SnipeExecution) -> Result<(), AllocationError> {
        if self.status != AllocationStatus::Active {
            return Err(AllocationError::NotActive {
                id: self.id,
                status: self.status,
            });
        }
        if self.spent + exec.amount > self.max_spend {
            return Err(AllocationError::BudgetExceeded {
                amount: exec.amount,
                spent: self.spent,
                max_spend: self.max_spend,
            });
        }

        self.spent += exec.amount;
        self.executed.push(exec);
        self.updated_at = Utc::now();
        if self.spent >= self.max_spend {
            self.status = AllocationStatus::Exhausted;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(amount: Decimal) -> SnipeExecution {
        SnipeExecution {
            order_id: Uuid::new_v4(),
            amount,
            venue_ref: "sig".into(),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn test_increment_is_fraction_of_budget() {
        let alloc = SnipeAllocation::new(1, "TOKEN", Decimal::ONE, Decimal::ONE);
        let inc = alloc
            .next_increment(Decimal::new(2, 1), Decimal::new(1, 2))
            .unwrap();
        assert_eq!(inc, Decimal::new(2, 1)); // 20% of 1.0
    }

    #[test]
    fn test_increment_shrinks_to_remaining() {
        let mut alloc = SnipeAllocation::new(1, "TOKEN", Decimal::ONE, Decimal::ONE);
        alloc.spent = Decimal::new(9, 1); // 0.9 spent, 0.1 left
        let inc = alloc
            .next_increment(Decimal::new(2, 1), Decimal::new(1, 2))
            .unwrap();
        assert_eq!(inc, Decimal::new(1, 1));
    }

    #[test]
    fn test_increment_below_min_viable() {
        let mut alloc = SnipeAllocation::new(1, "TOKEN", Decimal::ONE, Decimal::ONE);
        alloc.spent = Decimal::new(995, 3); // 0.005 left
        assert!(alloc
            .next_increment(Decimal::new(2, 1), Decimal::new(1, 2))
            .is_none());
    }

    #[test]
    fn test_budget_never_exceeded() {
        let mut alloc = SnipeAllocation::new(1, "TOKEN", Decimal::ONE, Decimal::ONE);
        alloc
            .record_execution(exec(Decimal::new(8, 1)))
            .expect("within budget");

        let err = alloc.record_execution(exec(Decimal::new(3, 1))).unwrap_err();
        assert!(matches!(err, AllocationError::BudgetExceeded { .. }));
        assert_eq!(alloc.spent, Decimal::new(8, 1), "spent unchanged on rejection");
    }

    #[test]
    fn test_exhaustion_after_five_fifths() {
        let mut alloc = SnipeAllocation::new(1, "TOKEN", Decimal::ONE, Decimal::ONE);
        for _ in 0..5 {
            let inc = alloc
                .next_increment(Decimal::new(2, 1), Decimal::new(1, 2))
                .expect("active allocation yields increments");
            alloc.record_execution(exec(inc)).unwrap();
        }

        assert_eq!(alloc.spent, Decimal::ONE);
        assert_eq!(alloc.status, AllocationStatus::Exhausted);
        assert!(alloc
            .next_increment(Decimal::new(2, 1), Decimal::new(1, 2))
            .is_none());
        assert_eq!(alloc.executed.len(), 5);
    }
}
