pub mod api;
pub mod clients;
pub mod config;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod services;
pub mod store;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::engine::TradingEngine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TradingEngine>,
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub metrics_handle: PrometheusHandle,
}
