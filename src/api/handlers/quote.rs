use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::AppError;
use crate::AppState;

use super::ApiResponse;

#[derive(Serialize)]
pub struct QuoteResponse {
    pub token_id: String,
    pub mid: Decimal,
}

pub async fn midpoint(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Result<Json<ApiResponse<QuoteResponse>>, AppError> {
    let mid = state.quotes.midpoint(&token_id).await?;
    Ok(Json(ApiResponse::ok(QuoteResponse { token_id, mid })))
}
