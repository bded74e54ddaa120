use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the faucet_claims table.
///
/// One row per successful disbursement. Rows are append-only and exist only
/// to compute rolling-window totals; a failed transfer records nothing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Claim {
    pub id: Uuid,
    pub owner: String,
    pub amount: Decimal,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
