//! Per-account win/loss counters, updated only as a side effect of
//! settlement. Both counters are monotonically non-decreasing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::wager::bank::AccountId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLossRecord {
    pub wins: u64,
    pub losses: u64,
}

#[derive(Debug, Default)]
pub struct AccountStats {
    records: HashMap<AccountId, WinLossRecord>,
}

impl AccountStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_win(&mut self, account: AccountId) {
        self.records.entry(account).or_default().wins += 1;
    }

    pub fn record_loss(&mut self, account: AccountId) {
        self.records.entry(account).or_default().losses += 1;
    }

    pub fn record(&self, account: AccountId) -> WinLossRecord {
        self.records.get(&account).copied().unwrap_or_default()
    }
}
