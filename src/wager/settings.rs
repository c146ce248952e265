//! Fee and limit configuration, mutable only through admin-guarded engine
//! operations.

use serde::{Deserialize, Serialize};

use crate::wager::amount::{to_amount, Amount};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Percentage of one stake retained on settlement (0-100).
    pub fee_percentage: u8,
    /// Cap on simultaneously-pending bets per account.
    pub max_pending_bets: u32,
    /// Smallest stake accepted at creation.
    pub min_stake: Amount,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fee_percentage: 2,
            max_pending_bets: 10,
            min_stake: to_amount(0.001),
        }
    }
}

impl EngineSettings {
    /// Fee retained from the pot when a bet settles: floor of one stake
    /// times the fee percentage.
    #[inline]
    pub fn fee_for(&self, amount: Amount) -> Amount {
        amount * self.fee_percentage as i128 / 100
    }
}
