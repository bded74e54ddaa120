pub mod api;
pub mod clients;
pub mod config;
pub mod errors;
pub mod faucet;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod store;

use std::sync::Arc;

use crate::clients::QuoteSource;
use crate::faucet::FaucetService;
use crate::ledger::PositionLedger;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub ledger: Arc<PositionLedger>,
    pub faucet: Arc<FaucetService>,
    pub quotes: Arc<dyn QuoteSource>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
