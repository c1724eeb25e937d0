use rust_decimal::Decimal;
use std::env;

use crate::execution::OrderLimits;

const DEFAULT_BASE_ASSET: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Asset every buy spends and every sell receives (wrapped SOL mint).
    pub base_asset: String,

    // Collaborator endpoints
    pub oracle_url: String,
    pub venue_url: String,
    pub activity_url: String,

    // Telegram alerts (optional — falls back to log-only alerts)
    pub telegram_bot_token: Option<String>,

    // Order admission
    pub min_trade_amount: Decimal,
    pub max_trade_amount: Decimal,
    pub min_slippage_pct: Decimal,
    pub max_slippage_pct: Decimal,

    // Monitor cadence
    pub limit_tick_secs: u64,
    pub stop_loss_tick_secs: u64,
    pub snipe_tick_secs: u64,
    pub copy_tick_secs: u64,
    pub swap_timeout_secs: u64,
    pub oracle_stall_threshold: u32,

    // Snipe sizing
    pub snipe_increment_fraction: Decimal,
    pub min_viable_amount: Decimal,

    // Copy-relay significance
    pub copy_min_amount: Decimal,
    pub copy_min_amount_usd: Decimal,
    pub copy_recency_secs: i64,

    // Fees
    pub fee_pct: Decimal,
    pub min_fee: Decimal,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            base_asset: env::var("BASE_ASSET").unwrap_or_else(|_| DEFAULT_BASE_ASSET.into()),

            oracle_url: env::var("ORACLE_URL")
                .map_err(|_| anyhow::anyhow!("ORACLE_URL must be set"))?,
            venue_url: env::var("VENUE_URL")
                .map_err(|_| anyhow::anyhow!("VENUE_URL must be set"))?,
            activity_url: env::var("ACTIVITY_URL")
                .map_err(|_| anyhow::anyhow!("ACTIVITY_URL must be set"))?,

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),

            min_trade_amount: parse_decimal("MIN_TRADE_AMOUNT", Decimal::new(1, 2)), // 0.01
            max_trade_amount: parse_decimal("MAX_TRADE_AMOUNT", Decimal::from(10)),
            min_slippage_pct: parse_decimal("MIN_SLIPPAGE_PCT", Decimal::new(1, 1)), // 0.1
            max_slippage_pct: parse_decimal("MAX_SLIPPAGE_PCT", Decimal::from(50)),

            limit_tick_secs: parse_u64("LIMIT_TICK_SECS", 10),
            stop_loss_tick_secs: parse_u64("STOP_LOSS_TICK_SECS", 30),
            snipe_tick_secs: parse_u64("SNIPE_TICK_SECS", 5),
            copy_tick_secs: parse_u64("COPY_TICK_SECS", 10),
            swap_timeout_secs: parse_u64("SWAP_TIMEOUT_SECS", 30),
            oracle_stall_threshold: parse_u64("ORACLE_STALL_THRESHOLD", 10) as u32,

            snipe_increment_fraction: parse_decimal("SNIPE_INCREMENT_FRACTION", Decimal::new(2, 1)), // 0.2
            min_viable_amount: parse_decimal("MIN_VIABLE_AMOUNT", Decimal::new(1, 2)), // 0.01

            copy_min_amount: parse_decimal("COPY_MIN_AMOUNT", Decimal::new(1, 1)), // 0.1
            copy_min_amount_usd: parse_decimal("COPY_MIN_AMOUNT_USD", Decimal::from(100)),
            copy_recency_secs: parse_u64("COPY_RECENCY_SECS", 300) as i64,

            fee_pct: parse_decimal("FEE_PCT", Decimal::new(1, 1)), // 0.1
            min_fee: parse_decimal("MIN_FEE", Decimal::new(1, 3)), // 0.001
        })
    }

    pub fn order_limits(&self) -> OrderLimits {
        OrderLimits {
            min_amount: self.min_trade_amount,
            max_amount: self.max_trade_amount,
            min_slippage_pct: self.min_slippage_pct,
            max_slippage_pct: self.max_slippage_pct,
        }
    }
}

fn parse_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
