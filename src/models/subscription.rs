use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running totals for a subscriber's mirrored trades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyStats {
    pub copied_trades: u64,
    pub copied_volume: Decimal,
    pub last_copied_at: Option<DateTime<Utc>>,
}

/// A following relationship: one subscriber mirroring one source wallet.
/// At most one active record exists per (subscriber, wallet) pair; an
/// unsubscribe soft-deletes by clearing `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopySubscription {
    pub subscriber_id: i64,
    pub source_wallet: String,
    pub enabled: bool,
    /// Fraction of the source trade size to mirror, 0–100.
    pub copy_percentage: Decimal,
    /// Hard cap per mirrored trade, in base-asset units.
    pub max_copy_amount: Decimal,
    /// Source trades below this size are not copied.
    pub min_source_amount: Decimal,
    pub copy_delay_secs: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub stats: CopyStats,
}

impl CopySubscription {
    pub fn new(subscriber_id: i64, source_wallet: impl Into<String>) -> Self {
        Self {
            subscriber_id,
            source_wallet: source_wallet.into(),
            enabled: true,
            copy_percentage: Decimal::ONE_HUNDRED,
            max_copy_amount: Decimal::ONE,
            min_source_amount: Decimal::new(1, 1), // 0.1
            copy_delay_secs: 0,
            is_active: true,
            created_at: Utc::now(),
            stats: CopyStats::default(),
        }
    }

    /// Scale a source trade down to this subscriber's mirrored size:
    /// percentage of the observed amount, capped at `max_copy_amount`.
    /// Returns None when the source trade is below the subscriber's minimum.
    pub fn scaled_amount(&self, source_amount: Decimal) -> Option<Decimal> {
        if source_amount < self.min_source_amount {
            return None;
        }
        let scaled = source_amount * self.copy_percentage / Decimal::ONE_HUNDRED;
        Some(scaled.min(self.max_copy_amount))
    }

    pub fn record_copy(&mut self, volume: Decimal, at: DateTime<Utc>) {
        self.stats.copied_trades += 1;
        self.stats.copied_volume += volume;
        self.stats.last_copied_at = Some(at);
    }
}

/// Partial settings update; unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopySettings {
    pub enabled: Option<bool>,
    pub copy_percentage: Option<Decimal>,
    pub max_copy_amount: Option<Decimal>,
    pub min_source_amount: Option<Decimal>,
    pub copy_delay_secs: Option<u64>,
}

impl CopySettings {
    pub fn apply(&self, sub: &mut CopySubscription) {
        if let Some(enabled) = self.enabled {
            sub.enabled = enabled;
        }
        if let Some(pct) = self.copy_percentage {
            sub.copy_percentage = pct;
        }
        if let Some(max) = self.max_copy_amount {
            sub.max_copy_amount = max;
        }
        if let Some(min) = self.min_source_amount {
            sub.min_source_amount = min;
        }
        if let Some(delay) = self.copy_delay_secs {
            sub.copy_delay_secs = delay;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_amount_percentage_and_cap() {
        let mut sub = CopySubscription::new(1, "wallet");
        sub.copy_percentage = Decimal::from(50);
        sub.max_copy_amount = Decimal::new(3, 1); // 0.3

        // 50% of 1.0 = 0.5, capped at 0.3
        assert_eq!(sub.scaled_amount(Decimal::ONE), Some(Decimal::new(3, 1)));

        // 50% of 0.4 = 0.2, under the cap
        assert_eq!(
            sub.scaled_amount(Decimal::new(4, 1)),
            Some(Decimal::new(2, 1))
        );
    }

    #[test]
    fn test_scaled_amount_source_minimum() {
        let sub = CopySubscription::new(1, "wallet");
        // Default minimum source size is 0.1
        assert_eq!(sub.scaled_amount(Decimal::new(5, 2)), None);
        assert!(sub.scaled_amount(Decimal::new(1, 1)).is_some());
    }

    #[test]
    fn test_settings_apply_partial() {
        let mut sub = CopySubscription::new(1, "wallet");
        let settings = CopySettings {
            copy_percentage: Some(Decimal::from(25)),
            ..Default::default()
        };
        settings.apply(&mut sub);

        assert_eq!(sub.copy_percentage, Decimal::from(25));
        assert!(sub.enabled, "untouched fields keep defaults");
        assert_eq!(sub.max_copy_amount, Decimal::ONE);
    }
}
