pub mod window;

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::clients::transfer::TokenTransfer;
use crate::errors::LedgerError;
use crate::store::{NewClaim, Store};

use window::{RollingWindow, WindowVerdict};

/// Disbursement limits, injected at construction (never read from ambient
/// state) so tests can pick arbitrary windows.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub window_hours: i64,
    pub window_limit: Decimal,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::ONE,
            max_amount: Decimal::from(10),
            window_hours: 24,
            window_limit: Decimal::from(100),
        }
    }
}

/// A granted disbursement.
#[derive(Debug, Clone, Serialize)]
pub struct Disbursement {
    pub amount: Decimal,
    pub tx_hash: String,
    /// Cumulative amount granted inside the current window, this grant
    /// included.
    pub window_total: Decimal,
    pub window_limit: Decimal,
}

/// Rate-limited test-token faucet.
///
/// The quota check and the claim insert are separate steps with the token
/// transfer in between, so two concurrent requests can both pass the check
/// and jointly overshoot the limit by at most one grant. That is accepted:
/// the currency is worthless and serializing every claim through a lock is
/// not worth it here. Quota is only consumed by successful transfers — a
/// failed transfer records nothing and the caller can cleanly retry.
pub struct FaucetService {
    store: Arc<dyn Store>,
    transfer: Arc<dyn TokenTransfer>,
    config: FaucetConfig,
}

impl FaucetService {
    pub fn new(
        store: Arc<dyn Store>,
        transfer: Arc<dyn TokenTransfer>,
        config: FaucetConfig,
    ) -> Self {
        Self {
            store,
            transfer,
            config,
        }
    }

    /// Grant `requested` test tokens to `owner`, clamped into the configured
    /// [min, max] band and subject to the rolling-window quota.
    pub async fn claim(&self, owner: &str, requested: Decimal) -> Result<Disbursement, LedgerError> {
        let owner = owner.trim().to_lowercase();
        if owner.is_empty() {
            return Err(LedgerError::Validation("owner is required".into()));
        }

        let amount = requested.clamp(self.config.min_amount, self.config.max_amount);

        let window = RollingWindow {
            hours: self.config.window_hours,
            limit: self.config.window_limit,
        };
        let now = Utc::now();
        let claims = self.store.claims_since(&owner, window.start(now)).await?;

        let claimed = match window.evaluate(&claims, amount, now) {
            WindowVerdict::Allowed => claims.iter().map(|c| c.amount).sum::<Decimal>(),
            WindowVerdict::Exhausted {
                claimed,
                retry_after,
            } => {
                tracing::info!(
                    owner = %owner,
                    claimed = %claimed,
                    limit = %self.config.window_limit,
                    "Faucet claim rejected: window quota exhausted"
                );
                return Err(LedgerError::QuotaExceeded {
                    claimed,
                    limit: self.config.window_limit,
                    retry_after,
                });
            }
        };

        let tx_hash = self.transfer.transfer(&owner, amount).await?;

        let claim = self
            .store
            .insert_claim(NewClaim {
                owner: owner.clone(),
                amount,
                tx_hash: Some(tx_hash.clone()),
            })
            .await?;

        tracing::info!(
            owner = %owner,
            amount = %claim.amount,
            tx_hash = %tx_hash,
            window_total = %(claimed + amount),
            "Faucet claim granted"
        );

        Ok(Disbursement {
            amount,
            tx_hash,
            window_total: claimed + amount,
            window_limit: self.config.window_limit,
        })
    }
}
