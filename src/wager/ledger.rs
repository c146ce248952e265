//! Bet ledger: the authoritative, append-only store of every bet ever
//! created, plus derived side mappings.
//!
//! Ids are sequential starting at 1 and never reused. Records are never
//! deleted; terminal bets stay in the ledger for audit. The side mappings
//! (owner-by-id, pending-count-by-account) are updated transactionally
//! alongside state transitions and are never independently authoritative.

use std::collections::HashMap;

use crate::wager::bank::AccountId;
use crate::wager::bet::{Bet, BetId};
use crate::wager::error::WagerError;

#[derive(Debug, Default)]
pub struct BetLedger {
    /// All bets, index = id - 1.
    bets: Vec<Bet>,
    /// Requester by bet id.
    owners: HashMap<BetId, AccountId>,
    /// Count of currently-pending bets per account.
    pending: HashMap<AccountId, u32>,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bet, assigning the next sequential id.
    pub fn append(&mut self, mut bet: Bet) -> BetId {
        let id = self.bets.len() as BetId + 1;
        bet.id = id;
        self.owners.insert(id, bet.requester);
        self.bets.push(bet);
        id
    }

    pub fn get(&self, id: BetId) -> Result<&Bet, WagerError> {
        if id == 0 {
            return Err(WagerError::NotFound(id));
        }
        self.bets
            .get(id as usize - 1)
            .ok_or(WagerError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: BetId) -> Result<&mut Bet, WagerError> {
        if id == 0 {
            return Err(WagerError::NotFound(id));
        }
        self.bets
            .get_mut(id as usize - 1)
            .ok_or(WagerError::NotFound(id))
    }

    pub fn owner(&self, id: BetId) -> Option<AccountId> {
        self.owners.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    pub fn pending_count(&self, account: AccountId) -> u32 {
        self.pending.get(&account).copied().unwrap_or(0)
    }

    pub fn inc_pending(&mut self, account: AccountId) {
        *self.pending.entry(account).or_insert(0) += 1;
    }

    /// Decrement the pending count; called exactly once per bet leaving
    /// Pending (cancel, expire, or accept).
    pub fn dec_pending(&mut self, account: AccountId) {
        let count = self.pending.entry(account).or_insert(0);
        debug_assert!(*count > 0, "pending count underflow for {}", account);
        *count = count.saturating_sub(1);
    }

    /// Most recent bets, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Bet> {
        self.bets.iter().rev().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bet> {
        self.bets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wager::amount::to_amount;
    use crate::wager::bet::{BetStatus, Token, Winner};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn make_bet(requester: AccountId) -> Bet {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Bet {
            id: 0,
            amount: to_amount(0.01),
            token: Token::Btc,
            predicted_price: 20_000,
            is_gt: true,
            specified_date: now + Duration::seconds(100),
            expiration_date: now + Duration::seconds(50),
            requester,
            acceptor: None,
            status: BetStatus::Pending,
            winner: Winner::Unknown,
            created_at: now,
        }
    }

    #[test]
    fn test_ids_are_sequential_from_one() {
        let mut ledger = BetLedger::new();
        let requester = Uuid::new_v4();

        assert_eq!(ledger.append(make_bet(requester)), 1);
        assert_eq!(ledger.append(make_bet(requester)), 2);
        assert_eq!(ledger.append(make_bet(requester)), 3);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(2).unwrap().id, 2);
        assert_eq!(ledger.owner(2), Some(requester));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut ledger = BetLedger::new();
        assert_eq!(ledger.get(0).unwrap_err(), WagerError::NotFound(0));
        assert_eq!(ledger.get(1).unwrap_err(), WagerError::NotFound(1));
        ledger.append(make_bet(Uuid::new_v4()));
        assert!(ledger.get(1).is_ok());
        assert_eq!(ledger.get(2).unwrap_err(), WagerError::NotFound(2));
    }

    #[test]
    fn test_pending_count_bookkeeping() {
        let mut ledger = BetLedger::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(ledger.pending_count(a), 0);
        ledger.inc_pending(a);
        ledger.inc_pending(a);
        ledger.inc_pending(b);
        assert_eq!(ledger.pending_count(a), 2);
        assert_eq!(ledger.pending_count(b), 1);

        ledger.dec_pending(a);
        assert_eq!(ledger.pending_count(a), 1);
        assert_eq!(ledger.pending_count(b), 1);
    }
}
