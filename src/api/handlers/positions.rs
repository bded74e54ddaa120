use axum::extract::{Path, State};
use axum::Json;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::{LedgerSummary, PositionBook};
use crate::models::{MarketMeta, Outcome, Trade};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct BuyRequest {
    pub owner: String,
    pub token_id: String,
    pub outcome: Outcome,
    pub shares: Decimal,
    pub price: Decimal,
    pub market_title: String,
    #[serde(default)]
    pub market_image: Option<String>,
    #[serde(default)]
    pub market_slug: Option<String>,
}

#[derive(Serialize)]
pub struct BuyResponse {
    pub position_id: Uuid,
}

pub async fn buy(
    State(state): State<AppState>,
    Json(req): Json<BuyRequest>,
) -> Result<Json<ApiResponse<BuyResponse>>, AppError> {
    let market = MarketMeta {
        title: req.market_title,
        image: req.market_image,
        slug: req.market_slug,
    };

    let position_id = state
        .ledger
        .buy(
            &req.owner,
            &req.token_id,
            req.outcome,
            req.shares,
            req.price,
            market,
        )
        .await?;

    counter!("paper_buys_total").increment(1);
    Ok(Json(ApiResponse::ok(BuyResponse { position_id })))
}

#[derive(Deserialize)]
pub struct SellRequest {
    pub owner: String,
    pub token_id: String,
    pub shares: Decimal,
    pub price: Decimal,
}

pub async fn sell(
    State(state): State<AppState>,
    Json(req): Json<SellRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state
        .ledger
        .sell(&req.owner, &req.token_id, req.shares, req.price)
        .await?;

    counter!("paper_sells_total").increment(1);
    Ok(Json(ApiResponse::ok(())))
}

#[derive(Deserialize)]
pub struct SettleRequest {
    pub owner: String,
    pub token_id: String,
    pub won: bool,
}

pub async fn settle(
    State(state): State<AppState>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state
        .ledger
        .settle(&req.owner, &req.token_id, req.won)
        .await?;

    counter!("paper_settlements_total").increment(1);
    Ok(Json(ApiResponse::ok(())))
}

pub async fn list(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<ApiResponse<PositionBook>>, AppError> {
    let book = state.ledger.positions(&owner).await?;
    Ok(Json(ApiResponse::ok(book)))
}

pub async fn trades(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let trades = state.ledger.trades(&owner).await?;
    Ok(Json(ApiResponse::ok(trades)))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<ApiResponse<LedgerSummary>>, AppError> {
    let summary = state.ledger.summary(&owner).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
