pub mod mem;
pub mod pg;

pub use mem::MemStore;
pub use pg::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Claim, Position, PositionStatus, Side, Trade};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write found the row changed (or already created) by a
    /// concurrent operation. The caller re-reads and retries.
    #[error("conflicting concurrent update")]
    Conflict,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Fields for creating a position on first buy.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub owner: String,
    pub token_id: String,
    pub outcome: String,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub cost: Decimal,
    pub market_title: String,
    pub market_image: Option<String>,
    pub market_slug: Option<String>,
}

/// Absolute new state for an open position, applied conditionally: the write
/// only lands if the row is still open with `expected_shares` shares. A miss
/// is a `StoreError::Conflict`.
#[derive(Debug, Clone)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub expected_shares: Decimal,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub cost: Decimal,
    pub realized_pnl: Decimal,
    pub status: PositionStatus,
    pub exit_price: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Fields for appending a trade row.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub owner: String,
    pub position_id: Uuid,
    pub token_id: String,
    pub side: Side,
    pub shares: Decimal,
    pub price: Decimal,
    pub total: Decimal,
}

/// Fields for appending a claim row after a successful transfer.
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub owner: String,
    pub amount: Decimal,
    pub tx_hash: Option<String>,
}

/// Persistence boundary for positions, trades and claims.
///
/// Mutations that must land together (position write + trade append) are
/// single trait methods so an implementation can wrap them in one
/// transaction. Conditional updates carry the expected prior share count
/// so concurrent read-modify-write cycles serialize through the store rather
/// than through in-process locks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Point lookup of the unique open position for (owner, token). Must be a
    /// strongly consistent read, never a cached view.
    async fn find_open_position(
        &self,
        owner: &str,
        token_id: &str,
    ) -> Result<Option<Position>, StoreError>;

    /// Create a position and append its opening buy trade in one atomic unit.
    /// Fails with `Conflict` if an open position for the same (owner, token)
    /// already exists.
    async fn insert_position_with_trade(
        &self,
        position: NewPosition,
        trade: NewTrade,
    ) -> Result<Position, StoreError>;

    /// Conditionally update a position and append a trade in one atomic unit.
    async fn update_position_with_trade(
        &self,
        update: PositionUpdate,
        trade: NewTrade,
    ) -> Result<(), StoreError>;

    /// Conditionally update a position with no accompanying trade
    /// (settlement by market resolution).
    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError>;

    /// All positions for an owner, newest first.
    async fn positions_by_owner(&self, owner: &str) -> Result<Vec<Position>, StoreError>;

    /// All trades for an owner, newest first.
    async fn trades_by_owner(&self, owner: &str) -> Result<Vec<Trade>, StoreError>;

    /// Claims for an owner with `created_at >= since`, newest first.
    async fn claims_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Claim>, StoreError>;

    /// Append a claim row.
    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
