use axum::extract::State;
use axum::Json;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{AppError, LedgerError};
use crate::faucet::Disbursement;
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub address: String,
    /// Omitted means "as much as a single claim allows"; the service clamps
    /// into its [min, max] band either way.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

pub async fn claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ApiResponse<Disbursement>>, AppError> {
    let requested = req.amount.unwrap_or(Decimal::MAX);

    match state.faucet.claim(&req.address, requested).await {
        Ok(grant) => {
            counter!("faucet_grants_total").increment(1);
            Ok(Json(ApiResponse::ok(grant)))
        }
        Err(e @ LedgerError::QuotaExceeded { .. }) => {
            counter!("faucet_rejections_total").increment(1);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
