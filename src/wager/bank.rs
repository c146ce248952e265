//! Value custody seam.
//!
//! Accounts are opaque identifiers that can hold and move value. The
//! engine only ever talks to the `Bank` trait; the in-memory
//! implementation backs the service and the tests. An outbound transfer is
//! the one operation that can fail after preconditions pass (the recipient
//! can bounce the payment), which is why the engine treats it as the last
//! step of every critical section.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::wager::amount::Amount;

/// Opaque, globally unique account identifier.
pub type AccountId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    InsufficientFunds { available: Amount, needed: Amount },
    Rejected { account: AccountId },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InsufficientFunds { available, needed } => {
                write!(f, "insufficient funds: have {} need {}", available, needed)
            }
            TransferError::Rejected { account } => {
                write!(f, "account {} rejected the payment", account)
            }
        }
    }
}

impl std::error::Error for TransferError {}

pub trait Bank: Send + Sync {
    /// Credit an account unconditionally (deposits from outside the system).
    fn deposit(&self, account: AccountId, amount: Amount);

    fn balance(&self, account: AccountId) -> Amount;

    /// Move value between accounts. Atomic: on any error neither balance
    /// changes.
    fn transfer(&self, from: AccountId, to: AccountId, amount: Amount)
        -> Result<(), TransferError>;
}

/// Process-local account store.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    accounts: RwLock<HashMap<AccountId, Amount>>,
    /// Accounts flagged to bounce incoming transfers, mirroring recipients
    /// that reject value.
    refusing: RwLock<HashSet<AccountId>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag or unflag an account so that transfers *to* it fail.
    pub fn set_refuse_incoming(&self, account: AccountId, refuse: bool) {
        let mut refusing = self.refusing.write();
        if refuse {
            refusing.insert(account);
        } else {
            refusing.remove(&account);
        }
    }
}

impl Bank for InMemoryBank {
    fn deposit(&self, account: AccountId, amount: Amount) {
        let mut accounts = self.accounts.write();
        *accounts.entry(account).or_insert(0) += amount;
    }

    fn balance(&self, account: AccountId) -> Amount {
        self.accounts.read().get(&account).copied().unwrap_or(0)
    }

    fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if self.refusing.read().contains(&to) {
            return Err(TransferError::Rejected { account: to });
        }

        let mut accounts = self.accounts.write();
        let available = accounts.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                available,
                needed: amount,
            });
        }

        *accounts.entry(from).or_insert(0) -= amount;
        *accounts.entry(to).or_insert(0) += amount;
        Ok(())
    }
}
