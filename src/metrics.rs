use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register series so they appear even before the first update.
    counter!("paper_buys_total").absolute(0);
    counter!("paper_sells_total").absolute(0);
    counter!("paper_settlements_total").absolute(0);
    counter!("faucet_grants_total").absolute(0);
    counter!("faucet_rejections_total").absolute(0);
    gauge!("open_positions").set(0.0);

    handle
}
