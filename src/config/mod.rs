use rust_decimal::Decimal;
use std::env;

use crate::faucet::FaucetConfig;
use crate::ledger::LedgerConfig;

const DEFAULT_CLOB_API_URL: &str = "https://clob.polymarket.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Quote source
    pub clob_api_url: String,

    // Faucet
    pub transfer_relay_url: String,
    pub faucet_min_amount: Decimal,
    pub faucet_max_amount: Decimal,
    pub faucet_window_hours: i64,
    pub faucet_window_limit: Decimal,

    // Ledger
    pub close_epsilon: Decimal,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            clob_api_url: env::var("CLOB_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLOB_API_URL.into()),

            transfer_relay_url: env::var("TRANSFER_RELAY_URL")
                .map_err(|_| anyhow::anyhow!("TRANSFER_RELAY_URL must be set"))?,
            faucet_min_amount: env::var("FAUCET_MIN_AMOUNT")
                .unwrap_or_else(|_| "1".into())
                .parse()
                .unwrap_or(Decimal::ONE),
            faucet_max_amount: env::var("FAUCET_MAX_AMOUNT")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(Decimal::from(10)),
            faucet_window_hours: env::var("FAUCET_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
            faucet_window_limit: env::var("FAUCET_WINDOW_LIMIT")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .unwrap_or(Decimal::from(100)),

            close_epsilon: env::var("CLOSE_EPSILON")
                .unwrap_or_else(|_| "0.001".into())
                .parse()
                .unwrap_or(Decimal::new(1, 3)),
        })
    }

    pub fn faucet_config(&self) -> FaucetConfig {
        FaucetConfig {
            min_amount: self.faucet_min_amount,
            max_amount: self.faucet_max_amount,
            window_hours: self.faucet_window_hours,
            window_limit: self.faucet_window_limit,
        }
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            close_epsilon: self.close_epsilon,
        }
    }
}
