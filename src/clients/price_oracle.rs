use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::ClientError;

#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Current price/liquidity source for an asset.
///
/// `Ok(None)` means the oracle has no quote for the asset — either it is not
/// tradable yet (what the snipe monitor probes for) or the oracle has a gap.
/// Monitors skip the asset for that tick rather than guessing.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, asset: &str) -> Result<Option<PriceQuote>, ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation (Jupiter-style price API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: HashMap<String, PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: Decimal,
}

#[derive(Debug, Clone)]
pub struct HttpPriceOracle {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPriceOracle {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn get_price(&self, asset: &str) -> Result<Option<PriceQuote>, ClientError> {
        let url = format!("{}/price", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("ids", asset)])
            .send()
            .await?;

        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), asset, "Price oracle returned non-2xx");
            return Ok(None);
        }

        let body: PriceResponse = resp.json().await?;
        Ok(body.data.get(asset).map(|entry| PriceQuote {
            price: entry.price,
            timestamp: Utc::now(),
        }))
    }
}
