//! Bet lifecycle engine.
//!
//! Owns custody: stakes move into a dedicated escrow account when a bet is
//! created or accepted and leave it exactly once, on the bet's terminal
//! transition. Every operation runs as a single critical section over the
//! whole engine state, with the outbound transfer performed *before* any
//! mutation commits — a rejected payment aborts the transition with the
//! ledger untouched.
//!
//! # State machine
//!
//! ```text
//! Pending ──cancel──▶ Canceled
//!    │ ────expire──▶ Expired
//!    └────accept──▶ Accepted ──settle──▶ Completed
//! ```
//!
//! No transition leaves Canceled, Expired, or Completed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, trace, warn};
use uuid::Uuid;

use crate::scrapers::PriceBoard;
use crate::wager::amount::{from_amount, Amount, Price, PRICE_SCALE};
use crate::wager::bank::{AccountId, Bank};
use crate::wager::bet::{Bet, BetId, BetStatus, PriceComparison, Token, Winner, TOKEN_COUNT};
use crate::wager::clock::Clock;
use crate::wager::error::WagerError;
use crate::wager::events::BetEvent;
use crate::wager::ledger::BetLedger;
use crate::wager::settings::EngineSettings;
use crate::wager::stats::{AccountStats, WinLossRecord};

/// Everything the engine mutates, behind one lock.
struct EngineState {
    ledger: BetLedger,
    stats: AccountStats,
    settings: EngineSettings,
    /// Settlement fees accrued in escrow, withdrawable by the admin.
    retained_fees: Amount,
}

pub struct BetEngine {
    state: Mutex<EngineState>,
    bank: Arc<dyn Bank>,
    prices: Arc<PriceBoard>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BetEvent>,
    /// Account holding all live stakes and accrued fees.
    escrow_account: AccountId,
    admin: AccountId,
}

impl BetEngine {
    pub fn new(
        admin: AccountId,
        settings: EngineSettings,
        bank: Arc<dyn Bank>,
        prices: Arc<PriceBoard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            state: Mutex::new(EngineState {
                ledger: BetLedger::new(),
                stats: AccountStats::new(),
                settings,
                retained_fees: 0,
            }),
            bank,
            prices,
            clock,
            events,
            escrow_account: Uuid::new_v4(),
            admin,
        }
    }

    /// Subscribe to engine notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BetEvent> {
        self.events.subscribe()
    }

    pub fn escrow_account(&self) -> AccountId {
        self.escrow_account
    }

    pub fn admin_account(&self) -> AccountId {
        self.admin
    }

    // =========================================================================
    // LIFECYCLE OPERATIONS
    // =========================================================================

    /// Create and fund a bet. The stake is escrowed atomically with record
    /// creation; on any rejection nothing is appended and no value moves.
    #[allow(clippy::too_many_arguments)]
    pub fn create_bet(
        &self,
        requester: AccountId,
        stake: Amount,
        token: Token,
        predicted_price: u64,
        is_gt: bool,
        specified_date: DateTime<Utc>,
        expiration_date: DateTime<Utc>,
    ) -> Result<BetId, WagerError> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if stake < state.settings.min_stake {
            return Err(WagerError::LimitExceeded(format!(
                "stake {} below minimum {}",
                stake, state.settings.min_stake
            )));
        }
        let pending = state.ledger.pending_count(requester);
        if pending > state.settings.max_pending_bets {
            return Err(WagerError::LimitExceeded(format!(
                "{} pending bets exceeds cap {}",
                pending, state.settings.max_pending_bets
            )));
        }
        if expiration_date <= now || specified_date <= now {
            return Err(WagerError::Expired);
        }
        if expiration_date >= specified_date {
            return Err(WagerError::InvalidSchedule(
                "expiration date must precede the specified date".to_string(),
            ));
        }

        // Escrow the stake before the record exists; a bounced transfer
        // leaves the ledger untouched.
        self.bank
            .transfer(requester, self.escrow_account, stake)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;

        let id = state.ledger.append(Bet {
            id: 0,
            amount: stake,
            token,
            predicted_price,
            is_gt,
            specified_date,
            expiration_date,
            requester,
            acceptor: None,
            status: BetStatus::Pending,
            winner: Winner::Unknown,
            created_at: now,
        });
        state.ledger.inc_pending(requester);

        info!(
            bet_id = id,
            requester = %requester,
            token = token.as_str(),
            amount = from_amount(stake),
            "bet created"
        );
        self.emit(BetEvent::BetCreated {
            bet_id: id,
            requester,
            token,
            amount: from_amount(stake),
        });
        Ok(id)
    }

    /// Cancel a pending bet before its acceptance deadline. Requester only;
    /// refunds the full stake.
    pub fn cancel_bet(&self, id: BetId, caller: AccountId) -> Result<(), WagerError> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let bet = state.ledger.get(id)?;
        if bet.status != BetStatus::Pending {
            return Err(WagerError::InvalidState { status: bet.status });
        }
        if bet.requester != caller {
            return Err(WagerError::PermissionDenied);
        }
        if now >= bet.expiration_date {
            return Err(WagerError::Expired);
        }
        let (requester, amount) = (bet.requester, bet.amount);

        self.bank
            .transfer(self.escrow_account, requester, amount)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;

        let bet = state.ledger.get_mut(id)?;
        bet.status = BetStatus::Canceled;
        state.ledger.dec_pending(requester);

        info!(bet_id = id, requester = %requester, "bet canceled");
        self.emit(BetEvent::BetCanceled { bet_id: id });
        Ok(())
    }

    /// Match a pending bet with an exactly-equal stake. The caller's stake
    /// joins the requester's in escrow (pot = 2x amount).
    pub fn accept_bet(
        &self,
        id: BetId,
        caller: AccountId,
        matched_value: Amount,
    ) -> Result<(), WagerError> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let bet = state.ledger.get(id)?;
        if bet.status != BetStatus::Pending {
            return Err(WagerError::InvalidState { status: bet.status });
        }
        if bet.requester == caller {
            return Err(WagerError::PermissionDenied);
        }
        if now >= bet.expiration_date || now >= bet.specified_date {
            return Err(WagerError::Expired);
        }
        if matched_value != bet.amount {
            return Err(WagerError::ValueMismatch {
                expected: bet.amount,
                got: matched_value,
            });
        }
        let requester = bet.requester;

        self.bank
            .transfer(caller, self.escrow_account, matched_value)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;

        let bet = state.ledger.get_mut(id)?;
        bet.acceptor = Some(caller);
        bet.status = BetStatus::Accepted;
        state.ledger.dec_pending(requester);

        info!(bet_id = id, acceptor = %caller, "bet accepted");
        self.emit(BetEvent::BetAccepted {
            bet_id: id,
            acceptor: caller,
        });
        Ok(())
    }

    /// Periodic trigger: expire an unmatched bet past its deadline, settle
    /// an accepted bet past its specified date. No-op on terminal bets and
    /// on bets whose deadlines have not arrived. Returns the (possibly
    /// updated) status.
    pub fn check_bet(&self, id: BetId) -> Result<BetStatus, WagerError> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let bet = state.ledger.get(id)?;
        let (status, expiration, specified) =
            (bet.status, bet.expiration_date, bet.specified_date);
        match status {
            BetStatus::Pending if now >= expiration => {
                self.expire(&mut state, id)?;
                Ok(BetStatus::Expired)
            }
            BetStatus::Accepted if now >= specified => {
                self.settle(&mut state, id)?;
                Ok(BetStatus::Completed)
            }
            _ => Ok(status),
        }
    }

    /// Check every non-terminal bet once; returns how many transitioned.
    pub fn sweep(&self) -> usize {
        let live: Vec<BetId> = {
            let state = self.state.lock();
            state
                .ledger
                .iter()
                .filter(|b| !b.status.is_terminal())
                .map(|b| b.id)
                .collect()
        };

        let mut transitions = 0;
        for id in live {
            match self.check_bet(id) {
                Ok(status) if status.is_terminal() => transitions += 1,
                Ok(_) => {}
                Err(e) => warn!(bet_id = id, error = %e, "check failed during sweep"),
            }
        }
        transitions
    }

    /// Refund an unaccepted bet whose deadline passed. Refund transfer and
    /// status flip are one atomic unit: a bounced refund aborts with the
    /// bet still Pending.
    fn expire(&self, state: &mut EngineState, id: BetId) -> Result<(), WagerError> {
        let bet = state.ledger.get(id)?;
        let (requester, amount) = (bet.requester, bet.amount);

        self.bank
            .transfer(self.escrow_account, requester, amount)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;

        let bet = state.ledger.get_mut(id)?;
        bet.status = BetStatus::Expired;
        state.ledger.dec_pending(requester);

        info!(bet_id = id, requester = %requester, "bet expired, stake refunded");
        self.emit(BetEvent::BetStatusChanged {
            bet_id: id,
            status: BetStatus::Expired,
            winner: None,
        });
        Ok(())
    }

    /// Resolve an accepted bet against the cached price snapshot and pay
    /// the winner the pot minus the fee. Payout and bookkeeping are one
    /// atomic unit: a bounced payout aborts with the bet still Accepted.
    fn settle(&self, state: &mut EngineState, id: BetId) -> Result<(), WagerError> {
        let bet = state.ledger.get(id)?;
        let requester = bet.requester;
        let acceptor = bet
            .acceptor
            .ok_or(WagerError::InvalidState { status: bet.status })?;
        let (amount, token, predicted, is_gt) =
            (bet.amount, bet.token, bet.predicted_price, bet.is_gt);

        let actual = self.prices.price(token);
        let comparison = compare_prices(actual, predicted);

        // Requester holds the pot by default; it only flips to the acceptor
        // when the requester bet on "greater" and the price closed above
        // the prediction.
        let winner = match comparison {
            PriceComparison::PredictedLower if is_gt => Winner::Acceptor,
            _ => Winner::Requester,
        };
        let winner_account = match winner {
            Winner::Acceptor => acceptor,
            _ => requester,
        };
        let loser_account = if winner_account == requester {
            acceptor
        } else {
            requester
        };

        let fee = state.settings.fee_for(amount);
        let payout = 2 * amount - fee;

        self.bank
            .transfer(self.escrow_account, winner_account, payout)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;

        let bet = state.ledger.get_mut(id)?;
        bet.status = BetStatus::Completed;
        bet.winner = winner;
        state.stats.record_win(winner_account);
        state.stats.record_loss(loser_account);
        state.retained_fees += fee;

        info!(
            bet_id = id,
            token = token.as_str(),
            actual_price = actual,
            predicted_price = predicted,
            comparison = ?comparison,
            winner = ?winner,
            payout = from_amount(payout),
            fee = from_amount(fee),
            "bet settled"
        );
        self.emit(BetEvent::BetStatusChanged {
            bet_id: id,
            status: BetStatus::Completed,
            winner: Some(winner),
        });
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn get_bet(&self, id: BetId) -> Result<Bet, WagerError> {
        self.state.lock().ledger.get(id).cloned()
    }

    pub fn bet_count(&self) -> usize {
        self.state.lock().ledger.len()
    }

    pub fn recent_bets(&self, limit: usize) -> Vec<Bet> {
        self.state.lock().ledger.recent(limit)
    }

    pub fn pending_count(&self, account: AccountId) -> u32 {
        self.state.lock().ledger.pending_count(account)
    }

    pub fn account_record(&self, account: AccountId) -> WinLossRecord {
        self.state.lock().stats.record(account)
    }

    pub fn settings(&self) -> EngineSettings {
        self.state.lock().settings.clone()
    }

    pub fn retained_fees(&self) -> Amount {
        self.state.lock().retained_fees
    }

    /// Current snapshot, one price per supported token.
    pub fn token_prices(&self) -> [Price; TOKEN_COUNT] {
        self.prices.all_prices()
    }

    // =========================================================================
    // ADMIN OPERATIONS
    // =========================================================================

    fn require_admin(&self, caller: AccountId) -> Result<(), WagerError> {
        if caller != self.admin {
            return Err(WagerError::PermissionDenied);
        }
        Ok(())
    }

    /// Pull fresh prices from the aggregator into the snapshot used by
    /// settlement. Admin only; settlement itself never reaches upstream.
    pub async fn refresh_prices(&self, caller: AccountId) -> Result<(), WagerError> {
        self.require_admin(caller)?;
        self.prices
            .refresh()
            .await
            .map_err(|e| WagerError::FeedUnavailable(e.to_string()))
    }

    pub fn set_fee_percentage(&self, caller: AccountId, pct: u8) -> Result<(), WagerError> {
        self.require_admin(caller)?;
        if pct > 100 {
            return Err(WagerError::LimitExceeded(format!(
                "fee percentage {} above 100",
                pct
            )));
        }
        let mut state = self.state.lock();
        state.settings.fee_percentage = pct;
        info!(fee_percentage = pct, "fee percentage updated");
        Ok(())
    }

    pub fn set_max_pending_bets(&self, caller: AccountId, max: u32) -> Result<(), WagerError> {
        self.require_admin(caller)?;
        let mut state = self.state.lock();
        state.settings.max_pending_bets = max;
        info!(max_pending_bets = max, "pending-bet cap updated");
        Ok(())
    }

    /// Move accrued settlement fees out of escrow to the admin. Returns
    /// the amount withdrawn.
    pub fn withdraw_fees(&self, caller: AccountId) -> Result<Amount, WagerError> {
        self.require_admin(caller)?;
        let mut state = self.state.lock();
        let amount = state.retained_fees;
        if amount == 0 {
            return Ok(0);
        }

        self.bank
            .transfer(self.escrow_account, self.admin, amount)
            .map_err(|e| WagerError::TransferFailed(e.to_string()))?;
        state.retained_fees = 0;

        info!(amount = from_amount(amount), "fees withdrawn");
        Ok(amount)
    }

    fn emit(&self, event: BetEvent) {
        // Non-blocking send; if no receivers, just drop.
        if let Err(e) = self.events.send(event) {
            trace!("no active bet event receivers: {}", e);
        }
    }
}

/// Compare the oracle price against a whole-unit prediction scaled to feed
/// precision. Done in i128 so large predictions cannot overflow.
fn compare_prices(actual: Price, predicted_whole: u64) -> PriceComparison {
    let actual = actual as i128;
    let predicted = predicted_whole as i128 * PRICE_SCALE as i128;
    if actual == predicted {
        PriceComparison::Equal
    } else if actual < predicted {
        PriceComparison::PredictedHigher
    } else {
        PriceComparison::PredictedLower
    }
}
