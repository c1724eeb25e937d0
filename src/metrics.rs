use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register counters so they appear even before the first increment.
    counter!("orders_executed").absolute(0);
    counter!("orders_failed").absolute(0);
    counter!("orders_expired").absolute(0);
    counter!("copy_trades_relayed").absolute(0);
    counter!("snipe_trades_executed").absolute(0);
    counter!("stop_losses_triggered").absolute(0);
    counter!("oracle_price_misses").absolute(0);

    handle
}
