use metrics::counter;
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks consecutive missing quotes per asset so a stalled oracle surfaces
/// in the logs instead of silently freezing every price-driven monitor.
pub struct OracleHealth {
    misses: Mutex<HashMap<String, u32>>,
    stall_threshold: u32,
}

impl OracleHealth {
    pub fn new(stall_threshold: u32) -> Self {
        Self {
            misses: Mutex::new(HashMap::new()),
            stall_threshold,
        }
    }

    pub fn record_success(&self, asset: &str) {
        self.misses.lock().unwrap().remove(asset);
    }

    pub fn record_miss(&self, asset: &str) {
        counter!("oracle_price_misses").increment(1);
        let mut misses = self.misses.lock().unwrap();
        let count = misses.entry(asset.to_string()).or_insert(0);
        *count += 1;
        if *count == self.stall_threshold {
            tracing::warn!(
                asset,
                consecutive_misses = *count,
                "No price for asset across consecutive checks"
            );
        }
    }
}
