use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Duration;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::store::StoreError;

/// Core error taxonomy shared by the position ledger and the faucet.
///
/// The split matters for the caller's remediation: `Validation` is never
/// retried, `QuotaExceeded` carries a back-off hint, `Storage` means retry
/// the whole atomic operation, `Upstream` means retry the external call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {claimed} of {limit} already granted in window, retry in ~{}h", retry_after_hours(.retry_after))]
    QuotaExceeded {
        claimed: Decimal,
        limit: Decimal,
        retry_after: Duration,
    },

    #[error("storage: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("upstream unavailable: {0}")]
    Upstream(String),
}

/// Hours until the quota window frees up, rounded up so the caller never
/// retries too early.
pub fn retry_after_hours(retry_after: &Duration) -> i64 {
    let secs = retry_after.num_seconds().max(0);
    (secs + 3599) / 3600
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => {
                LedgerError::Storage(anyhow::anyhow!("conflicting concurrent update"))
            }
            StoreError::Backend(e) => LedgerError::Storage(e),
        }
    }
}

/// HTTP-facing error wrapper in the axum `IntoResponse` style.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_hours: Option<i64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retry) = match &self {
            AppError::Ledger(LedgerError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            AppError::Ledger(LedgerError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg.clone(), None)
            }
            AppError::Ledger(LedgerError::QuotaExceeded { retry_after, .. }) => (
                StatusCode::TOO_MANY_REQUESTS,
                self.to_string(),
                Some(retry_after_hours(retry_after)),
            ),
            AppError::Ledger(LedgerError::Upstream(msg)) => {
                tracing::warn!(error = %msg, "Upstream service failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service unavailable — try again".into(),
                    None,
                )
            }
            AppError::Ledger(LedgerError::Storage(e)) => {
                tracing::error!("Storage error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
                retry_after_hours: retry,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}
