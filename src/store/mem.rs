use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Claim, Position, Trade};

use super::{NewClaim, NewPosition, NewTrade, PositionUpdate, Store, StoreError};

/// In-memory store for tests and local experiments.
///
/// A single mutex guards all three tables, so every trait method is trivially
/// atomic. Conditional-update semantics mirror `PgStore`: an update only
/// lands if the row is still open with the expected share count.
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    positions: Vec<Position>,
    trades: Vec<Trade>,
    claims: Vec<Claim>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_update(pos: &mut Position, update: &PositionUpdate) {
    pos.shares = update.shares;
    pos.entry_price = update.entry_price;
    pos.cost = update.cost;
    pos.realized_pnl = update.realized_pnl;
    pos.status = update.status.as_str().to_string();
    pos.exit_price = update.exit_price;
    pos.closed_at = update.closed_at;
}

fn make_trade(trade: &NewTrade) -> Trade {
    Trade {
        id: Uuid::new_v4(),
        owner: trade.owner.clone(),
        position_id: Some(trade.position_id),
        token_id: trade.token_id.clone(),
        side: trade.side.as_str().to_string(),
        shares: trade.shares,
        price: trade.price,
        total: trade.total,
        created_at: Some(Utc::now()),
    }
}

#[async_trait]
impl Store for MemStore {
    async fn find_open_position(
        &self,
        owner: &str,
        token_id: &str,
    ) -> Result<Option<Position>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .positions
            .iter()
            .find(|p| p.owner == owner && p.token_id == token_id && p.is_open())
            .cloned())
    }

    async fn insert_position_with_trade(
        &self,
        position: NewPosition,
        trade: NewTrade,
    ) -> Result<Position, StoreError> {
        let mut tables = self.inner.lock().await;

        let duplicate = tables
            .positions
            .iter()
            .any(|p| p.owner == position.owner && p.token_id == position.token_id && p.is_open());
        if duplicate {
            return Err(StoreError::Conflict);
        }

        let pos = Position {
            id: Uuid::new_v4(),
            owner: position.owner,
            token_id: position.token_id,
            outcome: position.outcome,
            status: "open".to_string(),
            shares: position.shares,
            entry_price: position.entry_price,
            cost: position.cost,
            exit_price: None,
            realized_pnl: Decimal::ZERO,
            market_title: position.market_title,
            market_image: position.market_image,
            market_slug: position.market_slug,
            opened_at: Some(Utc::now()),
            closed_at: None,
        };

        let mut trade = trade;
        trade.position_id = pos.id;
        let trade_row = make_trade(&trade);

        tables.positions.push(pos.clone());
        tables.trades.push(trade_row);
        Ok(pos)
    }

    async fn update_position_with_trade(
        &self,
        update: PositionUpdate,
        trade: NewTrade,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().await;

        let pos = tables
            .positions
            .iter_mut()
            .find(|p| p.id == update.id && p.is_open() && p.shares == update.expected_shares)
            .ok_or(StoreError::Conflict)?;
        apply_update(pos, &update);

        let trade_row = make_trade(&trade);
        tables.trades.push(trade_row);
        Ok(())
    }

    async fn update_position(&self, update: PositionUpdate) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().await;

        let pos = tables
            .positions
            .iter_mut()
            .find(|p| p.id == update.id && p.is_open() && p.shares == update.expected_shares)
            .ok_or(StoreError::Conflict)?;
        apply_update(pos, &update);
        Ok(())
    }

    async fn positions_by_owner(&self, owner: &str) -> Result<Vec<Position>, StoreError> {
        let tables = self.inner.lock().await;
        let mut positions: Vec<Position> = tables
            .positions
            .iter()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        positions.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(positions)
    }

    async fn trades_by_owner(&self, owner: &str) -> Result<Vec<Trade>, StoreError> {
        let tables = self.inner.lock().await;
        let mut trades: Vec<Trade> = tables
            .trades
            .iter()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trades)
    }

    async fn claims_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Claim>, StoreError> {
        let tables = self.inner.lock().await;
        let mut claims: Vec<Claim> = tables
            .claims
            .iter()
            .filter(|c| c.owner == owner && c.created_at >= since)
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(claims)
    }

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError> {
        let mut tables = self.inner.lock().await;
        let row = Claim {
            id: Uuid::new_v4(),
            owner: claim.owner,
            amount: claim.amount,
            tx_hash: claim.tx_hash,
            created_at: Utc::now(),
        };
        tables.claims.push(row.clone());
        Ok(row)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
