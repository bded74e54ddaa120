use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

use super::handlers;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Ledger
        .route("/api/paper/buy", post(handlers::positions::buy))
        .route("/api/paper/sell", post(handlers::positions::sell))
        .route("/api/paper/settle", post(handlers::positions::settle))
        .route("/api/paper/positions/:owner", get(handlers::positions::list))
        .route("/api/paper/trades/:owner", get(handlers::positions::trades))
        .route("/api/paper/summary/:owner", get(handlers::positions::summary))
        // Faucet
        .route("/api/faucet/claim", post(handlers::faucet::claim))
        // Quote proxy
        .route("/api/quote/:token_id", get(handlers::quote::midpoint))
        // Ops
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // The UI is served from another origin during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
