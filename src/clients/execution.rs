use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ClientError;

/// Realized result of a venue swap.
#[derive(Debug, Clone)]
pub struct SwapFill {
    pub realized_amount: Decimal,
    pub venue_ref: String,
}

/// The swap/exchange venue. Performs one atomic asset swap per call and
/// validates asset address formats. Signing is the venue's problem, not ours.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: Decimal,
        max_slippage_pct: Decimal,
    ) -> Result<SwapFill, ClientError>;

    async fn validate_address(&self, asset: &str) -> Result<bool, ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation (Jupiter-style swap API)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SwapRequestBody<'a> {
    input_mint: &'a str,
    output_mint: &'a str,
    amount: Decimal,
    /// Slippage tolerance in basis points, the venue's unit.
    slippage_bps: u32,
}

#[derive(Debug, Deserialize)]
struct SwapResponseBody {
    success: bool,
    #[serde(default)]
    output_amount: Option<Decimal>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidateResponseBody {
    valid: bool,
}

#[derive(Debug, Clone)]
pub struct HttpExecutionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpExecutionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn swap(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: Decimal,
        max_slippage_pct: Decimal,
    ) -> Result<SwapFill, ClientError> {
        let slippage_bps = (max_slippage_pct * Decimal::ONE_HUNDRED)
            .to_u32()
            .unwrap_or(u32::MAX);

        let body = SwapRequestBody {
            input_mint: input_asset,
            output_mint: output_asset,
            amount,
            slippage_bps,
        };

        let resp: SwapResponseBody = self
            .http
            .post(format!("{}/swap", self.base_url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !resp.success {
            return Err(ClientError::Venue(
                resp.error.unwrap_or_else(|| "swap rejected".into()),
            ));
        }

        let realized_amount = resp
            .output_amount
            .ok_or_else(|| ClientError::Decode("successful swap missing output_amount".into()))?;
        let venue_ref = resp
            .signature
            .ok_or_else(|| ClientError::Decode("successful swap missing signature".into()))?;

        Ok(SwapFill {
            realized_amount,
            venue_ref,
        })
    }

    async fn validate_address(&self, asset: &str) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/validate/{}", self.base_url, asset))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Ok(false);
        }

        let body: ValidateResponseBody = resp.json().await?;
        Ok(body.valid)
    }
}
