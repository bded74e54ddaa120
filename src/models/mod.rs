pub mod claim;
pub mod position;
pub mod trade;

pub use claim::Claim;
pub use position::{MarketMeta, Position};
pub use trade::Trade;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Which side of a binary market a position is long on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "yes",
            Outcome::No => "no",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PositionStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a paper position. `Open` is the only non-terminal state:
/// once a position is sold out or settled by market resolution it never
/// reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    ClosedSold,
    Won,
    Lost,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::ClosedSold => "closed_sold",
            PositionStatus::Won => "won",
            PositionStatus::Lost => "lost",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(PositionStatus::Open),
            "closed_sold" => Some(PositionStatus::ClosedSold),
            "won" => Some(PositionStatus::Won),
            "lost" => Some(PositionStatus::Lost),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PositionStatus::Open)
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_round_trip() {
        for status in [
            PositionStatus::Open,
            PositionStatus::ClosedSold,
            PositionStatus::Won,
            PositionStatus::Lost,
        ] {
            assert_eq!(PositionStatus::from_db_str(status.as_str()), Some(status));
        }
        assert_eq!(PositionStatus::from_db_str("liquidated"), None);
    }

    #[test]
    fn test_only_open_is_non_terminal() {
        assert!(!PositionStatus::Open.is_terminal());
        assert!(PositionStatus::ClosedSold.is_terminal());
        assert!(PositionStatus::Won.is_terminal());
        assert!(PositionStatus::Lost.is_terminal());
    }
}
