pub mod execution;
pub mod price_oracle;
pub mod wallet_activity;

pub use execution::{ExecutionClient, HttpExecutionClient, SwapFill};
pub use price_oracle::{HttpPriceOracle, PriceOracle, PriceQuote};
pub use wallet_activity::{HttpWalletActivityClient, WalletActivityClient};

use thiserror::Error;

/// Errors from the external venue, oracle, and activity collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("venue rejected request: {0}")]
    Venue(String),

    #[error("unexpected response shape: {0}")]
    Decode(String),
}
