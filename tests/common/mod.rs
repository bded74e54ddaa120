use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;

use paperbot::clients::{MockTransfer, QuoteSource};
use paperbot::errors::LedgerError;
use paperbot::faucet::{FaucetConfig, FaucetService};
use paperbot::ledger::{LedgerConfig, PositionLedger};
use paperbot::store::{MemStore, Store};
use paperbot::AppState;

/// Quote source that always returns the same mid-price.
pub struct StaticQuote(pub Decimal);

#[async_trait]
impl QuoteSource for StaticQuote {
    async fn midpoint(&self, _token_id: &str) -> Result<Decimal, LedgerError> {
        Ok(self.0)
    }
}

/// The Prometheus recorder can only be installed once per process, so every
/// test shares one handle.
pub fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(paperbot::metrics::init_metrics)
        .clone()
}

/// App state over the in-memory store with a succeeding mock transfer.
#[allow(dead_code)]
pub fn test_state(faucet_config: FaucetConfig) -> AppState {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());

    AppState {
        store: store.clone(),
        ledger: Arc::new(PositionLedger::new(store.clone(), LedgerConfig::default())),
        faucet: Arc::new(FaucetService::new(
            store,
            Arc::new(MockTransfer::succeeding()),
            faucet_config,
        )),
        quotes: Arc::new(StaticQuote(Decimal::new(55, 2))),
        metrics_handle: metrics_handle(),
    }
}
