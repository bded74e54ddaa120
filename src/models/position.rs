use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::PositionStatus;

/// Database row for the paper_positions table.
///
/// At most one row per (owner, token_id) has status `open`; `cost` is
/// maintained alongside `shares` and `entry_price` rather than derived, so
/// partial sells do not accumulate rounding drift.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub owner: String,
    pub token_id: String,
    pub outcome: String,
    pub status: String,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub cost: Decimal,
    pub exit_price: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub market_title: String,
    pub market_image: Option<String>,
    pub market_slug: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// An unrecognized status string counts as not open; the ledger never
    /// mutates a row it cannot classify.
    pub fn is_open(&self) -> bool {
        matches!(
            PositionStatus::from_db_str(&self.status),
            Some(s) if !s.is_terminal()
        )
    }
}

/// Display metadata carried through from the market the position was opened
/// on. Purely informational; the ledger never reads it back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMeta {
    pub title: String,
    pub image: Option<String>,
    pub slug: Option<String>,
}
