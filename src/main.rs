use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::time::Duration;

use soltrader::api::router::create_router;
use soltrader::clients::{HttpExecutionClient, HttpPriceOracle, HttpWalletActivityClient};
use soltrader::config::AppConfig;
use soltrader::engine::TradingEngine;
use soltrader::execution::{MarketExecutor, OrderLedger};
use soltrader::metrics::init_metrics;
use soltrader::registry::{AllocationBook, SubscriptionBook};
use soltrader::services::{
    CopyRelay, LimitMonitor, LogAlertSink, MonitorSupervisor, OracleHealth,
    PercentageFeeCollector, RelayFilter, SnipeMonitor, StopLossMonitor, TelegramAlertSink,
};
use soltrader::services::notifier::AlertSink;
use soltrader::store::{MemoryStore, Store};
use soltrader::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = init_metrics();

    // External record store is wired in deployment; without one the engine
    // runs on an in-process store and loses state on restart.
    tracing::warn!("No external store configured; using in-memory store");
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let http = reqwest::Client::new();
    let oracle = Arc::new(HttpPriceOracle::new(http.clone(), config.oracle_url.clone()));
    let venue = Arc::new(HttpExecutionClient::new(http.clone(), config.venue_url.clone()));
    let activity = Arc::new(HttpWalletActivityClient::new(
        http.clone(),
        config.activity_url.clone(),
    ));

    let alerts: Arc<dyn AlertSink> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramAlertSink::new(token.clone())),
        None => {
            tracing::info!("TELEGRAM_BOT_TOKEN not set; alerts go to the log");
            Arc::new(LogAlertSink)
        }
    };
    let fees = Arc::new(PercentageFeeCollector::new(
        store.clone(),
        config.fee_pct,
        config.min_fee,
    ));

    let ledger = Arc::new(OrderLedger::new(store.clone()));
    let subscriptions = Arc::new(SubscriptionBook::new(store.clone()));
    let allocations = Arc::new(AllocationBook::new(store.clone()));

    let executor = Arc::new(MarketExecutor::new(
        ledger.clone(),
        venue.clone(),
        oracle.clone(),
        fees,
        alerts.clone(),
        Duration::from_secs(config.swap_timeout_secs),
    ));

    let engine = Arc::new(TradingEngine::new(
        ledger.clone(),
        subscriptions.clone(),
        allocations.clone(),
        executor.clone(),
        venue.clone(),
        store.clone(),
        config.order_limits(),
    ));
    engine.restore().await?;

    // --- Background monitors ---
    let health = Arc::new(OracleHealth::new(config.oracle_stall_threshold));
    let mut supervisor = MonitorSupervisor::new();

    let limit_monitor = LimitMonitor::new(
        ledger.clone(),
        executor.clone(),
        oracle.clone(),
        health.clone(),
        Duration::from_secs(config.limit_tick_secs),
    );
    supervisor.spawn("limit_monitor", {
        let shutdown = supervisor.shutdown_signal();
        async move { limit_monitor.run(shutdown).await }
    });

    let stop_loss_monitor = StopLossMonitor::new(
        ledger.clone(),
        executor.clone(),
        oracle.clone(),
        health.clone(),
        alerts.clone(),
        Duration::from_secs(config.stop_loss_tick_secs),
    );
    supervisor.spawn("stop_loss_monitor", {
        let shutdown = supervisor.shutdown_signal();
        async move { stop_loss_monitor.run(shutdown).await }
    });

    let snipe_monitor = SnipeMonitor::new(
        ledger.clone(),
        allocations.clone(),
        executor.clone(),
        oracle.clone(),
        alerts.clone(),
        config.base_asset.clone(),
        config.snipe_increment_fraction,
        config.min_viable_amount,
        Duration::from_secs(config.snipe_tick_secs),
    );
    supervisor.spawn("snipe_monitor", {
        let shutdown = supervisor.shutdown_signal();
        async move { snipe_monitor.run(shutdown).await }
    });

    let copy_relay = CopyRelay::new(
        ledger.clone(),
        subscriptions.clone(),
        executor.clone(),
        activity,
        store.clone(),
        alerts.clone(),
        config.base_asset.clone(),
        config.min_viable_amount,
        RelayFilter {
            recency_window: ChronoDuration::seconds(config.copy_recency_secs),
            min_amount: config.copy_min_amount,
            min_amount_usd: config.copy_min_amount_usd,
            ..RelayFilter::default()
        },
        Duration::from_secs(config.copy_tick_secs),
    );
    supervisor.spawn("copy_relay", {
        let shutdown = supervisor.shutdown_signal();
        async move { copy_relay.run(shutdown).await }
    });

    // --- HTTP API ---
    let state = AppState {
        engine,
        store,
        config,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
