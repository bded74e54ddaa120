use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{Claim, Position, Trade};

use super::{NewClaim, NewPosition, NewTrade, PositionUpdate, Store, StoreError};

/// Postgres-backed store.
///
/// Atomic pairs (position write + trade append) run in one transaction;
/// position updates are conditional on the previously observed share count,
/// so two concurrent read-modify-write cycles on the same row cannot both
/// land — the loser gets `Conflict` and re-reads.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        // Verify connectivity
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

/// Unique-violation on the open-position partial index means another request
/// created the row first.
fn map_insert_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict;
        }
    }
    backend(e)
}

#[async_trait]
impl Store for PgStore {
    async fn find_open_position(
        &self,
        owner: &str,
        token_id: &str,
    ) -> Result<Option<Position>, StoreError> {
        sqlx::query_as::<_, Position>(
            "SELECT * FROM paper_positions
             WHERE owner = $1 AND token_id = $2 AND status = 'open'
             LIMIT 1",
        )
        .bind(owner)
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn insert_position_with_trade(
        &self,
        position: NewPosition,
        trade: NewTrade,
    ) -> Result<Position, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let pos = sqlx::query_as::<_, Position>(
            r#"
            INSERT INTO paper_positions
                (owner, token_id, outcome, status, shares, entry_price, cost,
                 realized_pnl, market_title, market_image, market_slug)
            VALUES ($1, $2, $3, 'open', $4, $5, $6, 0, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&position.owner)
        .bind(&position.token_id)
        .bind(&position.outcome)
        .bind(position.shares)
        .bind(position.entry_price)
        .bind(position.cost)
        .bind(&position.market_title)
        .bind(&position.market_image)
        .bind(&position.market_slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_err)?;

        sqlx::query(
            r#"
            INSERT INTO paper_trades (owner, position_id, token_id, side, shares, price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&trade.owner)
        .bind(pos.id)
        .bind(&trade.token_id)
        .bind(trade.side.as_str())
        .bind(trade.shares)
        .bind(trade.price)
        .bind(trade.total)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(pos)
    }

    async fn update_position_with_trade(
        &self,
        update: PositionUpdate,
        trade: NewTrade,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let result = sqlx::query(
            r#"
            UPDATE paper_positions
            SET shares = $3, entry_price = $4, cost = $5, realized_pnl = $6,
                status = $7, exit_price = $8, closed_at = $9
            WHERE id = $1 AND status = 'open' AND shares = $2
            "#,
        )
        .bind(update.id)
        .bind(update.expected_shares)
        .bind(update.shares)
        .bind(update.entry_price)
        .bind(update.cost)
        .bind(update.realized_pnl)
        .bind(update.status.as_str())
        .bind(update.exit_price)
        .bind(update.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        sqlx::query(
            r#"
            INSERT INTO paper_trades (owner, position_id, token_id, side, shares, price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&trade.owner)
        .bind(trade.position_id)
        .bind(&trade.token_id)
        .bind(trade.side.as_str())
        .bind(trade.shares)
        .bind(trade.price)
        .bind(trade.total)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE paper_positions
            SET shares = $3, entry_price = $4, cost = $5, realized_pnl = $6,
                status = $7, exit_price = $8, closed_at = $9
            WHERE id = $1 AND status = 'open' AND shares = $2
            "#,
        )
        .bind(update.id)
        .bind(update.expected_shares)
        .bind(update.shares)
        .bind(update.entry_price)
        .bind(update.cost)
        .bind(update.realized_pnl)
        .bind(update.status.as_str())
        .bind(update.exit_price)
        .bind(update.closed_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn positions_by_owner(&self, owner: &str) -> Result<Vec<Position>, StoreError> {
        sqlx::query_as::<_, Position>(
            "SELECT * FROM paper_positions WHERE owner = $1 ORDER BY opened_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }

    async fn trades_by_owner(&self, owner: &str) -> Result<Vec<Trade>, StoreError> {
        sqlx::query_as::<_, Trade>(
            "SELECT * FROM paper_trades WHERE owner = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }

    async fn claims_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Claim>, StoreError> {
        sqlx::query_as::<_, Claim>(
            r#"
            SELECT * FROM faucet_claims
            WHERE owner = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError> {
        sqlx::query_as::<_, Claim>(
            r#"
            INSERT INTO faucet_claims (owner, amount, tx_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&claim.owner)
        .bind(claim.amount)
        .bind(&claim.tx_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
