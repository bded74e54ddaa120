use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::errors::LedgerError;

/// Opaque on-chain token transfer: hand over an address and an amount, get
/// back a transaction reference or a failure. Wallet signing and broadcast
/// live behind this boundary; the faucet only cares that no claim is
/// recorded unless this succeeds.
#[async_trait]
pub trait TokenTransfer: Send + Sync {
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    success: bool,
    tx_hash: Option<String>,
    error: Option<String>,
}

/// Transfer client posting to the faucet relay, which holds the faucet key
/// and broadcasts the ERC-20 transfer.
#[derive(Debug, Clone)]
pub struct RelayTransferClient {
    http: Client,
    relay_url: String,
}

impl RelayTransferClient {
    pub fn new(http: Client, relay_url: String) -> Self {
        Self { http, relay_url }
    }
}

#[async_trait]
impl TokenTransfer for RelayTransferClient {
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, LedgerError> {
        let resp = self
            .http
            .post(&self.relay_url)
            .json(&json!({ "to": to, "amount": amount }))
            .send()
            .await
            .map_err(|e| LedgerError::Upstream(format!("transfer request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LedgerError::Upstream(format!("transfer relay returned error: {e}")))?;

        let body: RelayResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Upstream(format!("transfer relay body unreadable: {e}")))?;

        if !body.success {
            return Err(LedgerError::Upstream(format!(
                "transfer rejected: {}",
                body.error.unwrap_or_else(|| "unknown".into())
            )));
        }

        body.tx_hash
            .ok_or_else(|| LedgerError::Upstream("transfer succeeded without a tx hash".into()))
    }
}

/// Deterministic transfer double for tests.
#[derive(Debug, Clone)]
pub struct MockTransfer {
    fail: bool,
}

impl MockTransfer {
    pub fn succeeding() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl TokenTransfer for MockTransfer {
    async fn transfer(&self, to: &str, amount: Decimal) -> Result<String, LedgerError> {
        if self.fail {
            return Err(LedgerError::Upstream("mock transfer down".into()));
        }
        Ok(format!("0xmock-{to}-{amount}"))
    }
}
