use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::models::{TradeDirection, TradeOrder};

/// Something worth telling the order's owner about.
#[derive(Debug, Clone)]
pub enum AlertEvent {
    TradeCompleted {
        order: TradeOrder,
    },
    TradeFailed {
        order: TradeOrder,
        error: String,
    },
    StopLossTriggered {
        order: TradeOrder,
        current_price: Decimal,
    },
    SnipeExecuted {
        allocation_id: Uuid,
        asset: String,
        amount: Decimal,
        venue_ref: String,
    },
    CopyTradeExecuted {
        source_wallet: String,
        direction: TradeDirection,
        amount: Decimal,
        venue_ref: String,
    },
}

/// Delivery is fire-and-forget: failures are logged but never block or fail
/// the trade that produced the event.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, user_id: i64, event: AlertEvent);
}

/// Telegram delivery, one chat per user.
#[derive(Debug, Clone)]
pub struct TelegramAlertSink {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramAlertSink {
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
        }
    }

    async fn send(&self, chat_id: i64, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        chat_id,
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, chat_id, "Failed to send Telegram notification");
            }
        }
    }
}

#[async_trait]
impl AlertSink for TelegramAlertSink {
    async fn notify(&self, user_id: i64, event: AlertEvent) {
        self.send(user_id, &format_event(&event)).await;
    }
}

/// Fallback sink when no Telegram credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, user_id: i64, event: AlertEvent) {
        tracing::info!(user_id, event = ?event, "Alert");
    }
}

fn short_wallet(wallet: &str) -> String {
    if wallet.len() > 10 {
        format!("{}...{}", &wallet[..6], &wallet[wallet.len() - 4..])
    } else {
        wallet.to_string()
    }
}

pub fn format_event(event: &AlertEvent) -> String {
    match event {
        AlertEvent::TradeCompleted { order } => format!(
            "*Trade Completed*\nKind: {}\nSpent: {} {}\nReceived: {} {}\nTx: `{}`",
            order.kind,
            order.amount,
            order.input_asset,
            order
                .realized_amount
                .map(|a| a.to_string())
                .unwrap_or_else(|| "?".into()),
            order.output_asset,
            order.venue_ref.as_deref().unwrap_or("unknown"),
        ),
        AlertEvent::TradeFailed { order, error } => format!(
            "*Trade Failed*\nKind: {}\nAmount: {} {}\nError: {}",
            order.kind, order.amount, order.input_asset, error,
        ),
        AlertEvent::StopLossTriggered {
            order,
            current_price,
        } => format!(
            "*Stop-Loss Triggered*\nAsset: {}\nEntry: {}\nCurrent: {}\nSelling position",
            order.output_asset,
            order
                .entry_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".into()),
            current_price,
        ),
        AlertEvent::SnipeExecuted {
            allocation_id,
            asset,
            amount,
            venue_ref,
        } => format!(
            "*Snipe Executed*\nAsset: `{}`\nAmount: {}\nAllocation: `{}`\nTx: `{}`",
            asset, amount, allocation_id, venue_ref,
        ),
        AlertEvent::CopyTradeExecuted {
            source_wallet,
            direction,
            amount,
            venue_ref,
        } => format!(
            "*Copy Trade Executed*\nSource: `{}`\nDirection: {}\nAmount: {}\nTx: `{}`",
            short_wallet(source_wallet),
            direction,
            amount,
            venue_ref,
        ),
    }
}
