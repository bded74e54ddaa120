use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::LedgerError;

/// Live mid-price lookup for a market token.
///
/// The ledger never calls this: open positions are valued at cost basis.
/// Mark-to-market is the caller's concern, combined client-side with the
/// positions it already holds. No freshness is promised.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn midpoint(&self, token_id: &str) -> Result<Decimal, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct MidpointResponse {
    mid: String,
}

/// Quote source backed by the Polymarket CLOB `/midpoint` endpoint.
#[derive(Debug, Clone)]
pub struct ClobQuoteClient {
    http: Client,
    base_url: String,
}

impl ClobQuoteClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl QuoteSource for ClobQuoteClient {
    async fn midpoint(&self, token_id: &str) -> Result<Decimal, LedgerError> {
        let url = format!("{}/midpoint?token_id={token_id}", self.base_url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LedgerError::Upstream(format!("midpoint request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LedgerError::Upstream(format!("midpoint returned error: {e}")))?;

        let body: MidpointResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Upstream(format!("midpoint body unreadable: {e}")))?;

        let mid: Decimal = body
            .mid
            .parse()
            .map_err(|e| LedgerError::Upstream(format!("midpoint not a number: {e}")))?;

        if mid < Decimal::ZERO || mid > Decimal::ONE {
            return Err(LedgerError::Upstream(format!(
                "midpoint {mid} outside [0, 1]"
            )));
        }

        Ok(mid)
    }
}
