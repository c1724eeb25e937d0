use async_trait::async_trait;

use crate::models::SourceTrade;

use super::ClientError;

/// Recent-trade feed for watched source wallets. The relay polls this; there
/// is no push channel, so detection latency is bounded by the tick interval.
#[async_trait]
pub trait WalletActivityClient: Send + Sync {
    async fn recent_trades(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<SourceTrade>, ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpWalletActivityClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpWalletActivityClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WalletActivityClient for HttpWalletActivityClient {
    async fn recent_trades(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<SourceTrade>, ClientError> {
        let url = format!("{}/wallets/{}/trades", self.base_url, wallet);
        let trades: Vec<SourceTrade> = self
            .http
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await?
            .json()
            .await?;

        Ok(trades)
    }
}
