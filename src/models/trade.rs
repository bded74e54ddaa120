use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the paper_trades table.
///
/// Append-only audit trail: one row per buy or sell execution. A trade
/// references its position but outlives its closure, and is never updated
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub owner: String,
    pub position_id: Option<Uuid>,
    pub token_id: String,
    pub side: String,
    pub shares: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}
