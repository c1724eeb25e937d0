// Not every test binary exercises every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use soltrader::clients::{
    ClientError, ExecutionClient, PriceOracle, PriceQuote, SwapFill, WalletActivityClient,
};
use soltrader::engine::TradingEngine;
use soltrader::execution::{MarketExecutor, OrderLedger, OrderLimits};
use soltrader::models::{AccountProfile, AccountTier, SourceTrade};
use soltrader::registry::{AllocationBook, SubscriptionBook};
use soltrader::services::notifier::{AlertEvent, AlertSink};
use soltrader::services::PercentageFeeCollector;
use soltrader::store::MemoryStore;

pub const BASE_ASSET: &str = "SOL";

/// Oracle whose quotes are scripted per asset. A sequence plays out one
/// entry per call; the final entry repeats once the sequence is drained.
#[derive(Default)]
pub struct ScriptedOracle {
    quotes: Mutex<HashMap<String, VecDeque<Option<Decimal>>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, asset: &str, quote: Option<Decimal>) {
        self.quotes
            .lock()
            .unwrap()
            .entry(asset.to_string())
            .or_default()
            .push_back(quote);
    }

    pub fn push_sequence(&self, asset: &str, quotes: &[Option<Decimal>]) {
        for quote in quotes {
            self.push(asset, *quote);
        }
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn get_price(&self, asset: &str) -> Result<Option<PriceQuote>, ClientError> {
        let mut quotes = self.quotes.lock().unwrap();
        let Some(seq) = quotes.get_mut(asset) else {
            return Ok(None);
        };
        let quote = if seq.len() > 1 {
            seq.pop_front().flatten()
        } else {
            seq.front().copied().flatten()
        };
        Ok(quote.map(|price| PriceQuote {
            price,
            timestamp: Utc::now(),
        }))
    }
}

/// Venue stub: every swap fills at a fixed output multiple of the input
/// amount unless told to fail. Counts calls so tests can assert
/// exactly-once behavior.
pub struct StubVenue {
    pub swap_calls: AtomicU32,
    fail_swaps: AtomicBool,
    accept_all_addresses: AtomicBool,
    known_addresses: Mutex<HashSet<String>>,
    output_multiplier: Decimal,
}

impl StubVenue {
    pub fn new() -> Self {
        Self {
            swap_calls: AtomicU32::new(0),
            fail_swaps: AtomicBool::new(false),
            accept_all_addresses: AtomicBool::new(true),
            known_addresses: Mutex::new(HashSet::new()),
            output_multiplier: Decimal::from(100),
        }
    }

    pub fn fail_swaps(&self, fail: bool) {
        self.fail_swaps.store(fail, Ordering::SeqCst);
    }

    pub fn restrict_addresses(&self, assets: &[&str]) {
        self.accept_all_addresses.store(false, Ordering::SeqCst);
        let mut known = self.known_addresses.lock().unwrap();
        known.clear();
        known.extend(assets.iter().map(|s| s.to_string()));
    }

    pub fn swap_count(&self) -> u32 {
        self.swap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionClient for StubVenue {
    async fn swap(
        &self,
        _input: &str,
        _output: &str,
        amount: Decimal,
        _slippage: Decimal,
    ) -> Result<SwapFill, ClientError> {
        let call = self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_swaps.load(Ordering::SeqCst) {
            return Err(ClientError::Venue("injected swap failure".into()));
        }
        Ok(SwapFill {
            realized_amount: amount * self.output_multiplier,
            venue_ref: format!("sig-{call}"),
        })
    }

    async fn validate_address(&self, asset: &str) -> Result<bool, ClientError> {
        if self.accept_all_addresses.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self.known_addresses.lock().unwrap().contains(asset))
    }
}

/// Captures every alert for later assertions.
#[derive(Default)]
pub struct RecordingAlertSink {
    events: Mutex<Vec<(i64, AlertEvent)>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(i64, AlertEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn notify(&self, user_id: i64, event: AlertEvent) {
        self.events.lock().unwrap().push((user_id, event));
    }
}

/// Activity feed serving a fixed set of observed trades.
#[derive(Default)]
pub struct StaticActivityFeed {
    trades: Mutex<Vec<SourceTrade>>,
}

impl StaticActivityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trade(&self, trade: SourceTrade) {
        self.trades.lock().unwrap().push(trade);
    }
}

#[async_trait]
impl WalletActivityClient for StaticActivityFeed {
    async fn recent_trades(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<SourceTrade>, ClientError> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.wallet == wallet)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Fully wired engine over in-process collaborators.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<OrderLedger>,
    pub subscriptions: Arc<SubscriptionBook>,
    pub allocations: Arc<AllocationBook>,
    pub executor: Arc<MarketExecutor>,
    pub engine: Arc<TradingEngine>,
    pub oracle: Arc<ScriptedOracle>,
    pub venue: Arc<StubVenue>,
    pub alerts: Arc<RecordingAlertSink>,
    pub activity: Arc<StaticActivityFeed>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let oracle = Arc::new(ScriptedOracle::new());
    let venue = Arc::new(StubVenue::new());
    let alerts = Arc::new(RecordingAlertSink::new());
    let activity = Arc::new(StaticActivityFeed::new());

    let ledger = Arc::new(OrderLedger::new(store.clone()));
    let subscriptions = Arc::new(SubscriptionBook::new(store.clone()));
    let allocations = Arc::new(AllocationBook::new(store.clone()));

    // 0.1% fee, 0.001 floor
    let fees = Arc::new(PercentageFeeCollector::new(
        store.clone(),
        Decimal::new(1, 1),
        Decimal::new(1, 3),
    ));

    let executor = Arc::new(MarketExecutor::new(
        ledger.clone(),
        venue.clone(),
        oracle.clone(),
        fees,
        alerts.clone(),
        Duration::from_secs(5),
    ));

    let engine = Arc::new(TradingEngine::new(
        ledger.clone(),
        subscriptions.clone(),
        allocations.clone(),
        executor.clone(),
        venue.clone(),
        store.clone(),
        OrderLimits::default(),
    ));

    Harness {
        store,
        ledger,
        subscriptions,
        allocations,
        executor,
        engine,
        oracle,
        venue,
        alerts,
        activity,
    }
}

pub fn seed_premium_account(harness: &Harness, user_id: i64) {
    harness
        .store
        .upsert_account(AccountProfile::new(user_id, AccountTier::Premium));
}

pub fn seed_free_account(harness: &Harness, user_id: i64) {
    harness
        .store
        .upsert_account(AccountProfile::new(user_id, AccountTier::Free));
}
