//! Peer-to-peer price wager engine.
//!
//! Two parties stake equal value on where an asset's price will close
//! relative to the requester's prediction. This module owns the whole
//! lifecycle:
//!
//! 1. A requester creates and funds a bet (stake moves to escrow).
//! 2. An acceptor matches the exact stake before the deadline, or the bet
//!    expires and refunds.
//! 3. Once the specified date arrives, settlement compares the cached
//!    oracle price against the prediction and pays the winner the pot
//!    minus the protocol fee.
//!
//! Custody invariant: escrow holds exactly one stake per live participant
//! and releases funds exactly once, on the terminal transition.

pub mod amount;
pub mod bank;
pub mod bet;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod settings;
pub mod stats;


pub use amount::{from_amount, to_amount, to_price, Amount, Price, AMOUNT_SCALE, PRICE_SCALE};
pub use bank::{AccountId, Bank, InMemoryBank, TransferError};
pub use bet::{Bet, BetId, BetStatus, PriceComparison, Token, Winner, TOKEN_COUNT};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::BetEngine;
pub use error::WagerError;
pub use events::BetEvent;
pub use ledger::BetLedger;
pub use settings::EngineSettings;
pub use stats::{AccountStats, WinLossRecord};
