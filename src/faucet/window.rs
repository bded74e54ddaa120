use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::Claim;

/// Rolling-window quota: cumulative granted amount over a sliding interval
/// ending now.
#[derive(Debug, Clone, Copy)]
pub struct RollingWindow {
    pub hours: i64,
    pub limit: Decimal,
}

/// Outcome of evaluating a prospective grant against the window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowVerdict {
    Allowed,
    Exhausted {
        claimed: Decimal,
        /// Time until the oldest in-window claim ages out and frees quota.
        retry_after: Duration,
    },
}

impl RollingWindow {
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.hours)
    }

    /// Evaluate `amount` against claims already inside the window.
    /// `claims` must all have `created_at >= self.start(now)`; ordering does
    /// not matter.
    pub fn evaluate(
        &self,
        claims: &[Claim],
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> WindowVerdict {
        let claimed: Decimal = claims.iter().map(|c| c.amount).sum();
        if claimed + amount <= self.limit {
            return WindowVerdict::Allowed;
        }

        let retry_after = claims
            .iter()
            .map(|c| c.created_at)
            .min()
            .map(|oldest| oldest + Duration::hours(self.hours) - now)
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(|| Duration::hours(self.hours));

        WindowVerdict::Exhausted {
            claimed,
            retry_after,
        }
    }
}
