use std::sync::Arc;

use paperbot::api::router::create_router;
use paperbot::clients::{ClobQuoteClient, RelayTransferClient};
use paperbot::config::AppConfig;
use paperbot::faucet::FaucetService;
use paperbot::ledger::PositionLedger;
use paperbot::store::{PgStore, Store};
use paperbot::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pg = PgStore::connect(&config.database_url).await?;
    pg.migrate().await?;
    tracing::info!("Database connected");

    let metrics_handle = paperbot::metrics::init_metrics();

    let store: Arc<dyn Store> = Arc::new(pg);
    let http = reqwest::Client::new();

    let ledger = Arc::new(PositionLedger::new(store.clone(), config.ledger_config()));
    let faucet = Arc::new(FaucetService::new(
        store.clone(),
        Arc::new(RelayTransferClient::new(
            http.clone(),
            config.transfer_relay_url.clone(),
        )),
        config.faucet_config(),
    ));
    let quotes = Arc::new(ClobQuoteClient::new(http, config.clob_api_url.clone()));

    let state = AppState {
        store,
        ledger,
        faucet,
        quotes,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
