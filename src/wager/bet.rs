//! Bet data model: the central record plus its closed status/outcome tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wager::amount::Amount;
use crate::wager::bank::AccountId;

/// Sequential bet identifier. Id space starts at 1 and is never reused.
pub type BetId = u64;

/// Supported assets. Quoted against USDT on the aggregator side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Token {
    Btc,
    Eth,
    Bnb,
    Xrp,
    Ada,
    Sol,
}

/// Number of supported assets; also the width of the price snapshot.
pub const TOKEN_COUNT: usize = 6;

impl Token {
    pub const ALL: [Token; TOKEN_COUNT] = [
        Token::Btc,
        Token::Eth,
        Token::Bnb,
        Token::Xrp,
        Token::Ada,
        Token::Sol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Btc => "BTC",
            Token::Eth => "ETH",
            Token::Bnb => "BNB",
            Token::Xrp => "XRP",
            Token::Ada => "ADA",
            Token::Sol => "SOL",
        }
    }

    /// Aggregator trading pair, e.g. BTCUSDT.
    pub fn pair_symbol(&self) -> String {
        format!("{}USDT", self.as_str())
    }

    /// Position inside the fixed-width price snapshot.
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Lifecycle states. Pending is the only state with live transitions out;
/// Accepted can only complete; the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Expired,
    Canceled,
    Accepted,
    Completed,
}

impl BetStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            BetStatus::Pending | BetStatus::Accepted => false,
            BetStatus::Expired | BetStatus::Canceled | BetStatus::Completed => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Expired => "expired",
            BetStatus::Canceled => "canceled",
            BetStatus::Accepted => "accepted",
            BetStatus::Completed => "completed",
        }
    }
}

/// Settlement outcome. Unknown until the bet completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Unknown,
    Requester,
    Acceptor,
}

/// Result of comparing the oracle price against the requester's
/// (scaled) prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceComparison {
    /// Actual price equals the prediction.
    Equal,
    /// Prediction was higher than the actual price (actual < predicted).
    PredictedHigher,
    /// Prediction was lower than the actual price (actual > predicted).
    PredictedLower,
}

/// A peer-to-peer price wager.
///
/// The requester funds the bet at creation; the acceptor matches the exact
/// stake to activate it. Escrow equals `amount` per participant while the
/// bet is live and zero after any terminal transition. Terminal records are
/// retained forever for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    /// Stake of each participant, fixed-point.
    pub amount: Amount,
    pub token: Token,
    /// Requester's prediction in whole units (scaled to feed precision at
    /// settlement).
    pub predicted_price: u64,
    /// true: requester's side is "price ends above the prediction".
    pub is_gt: bool,
    /// When the price is checked to determine the winner.
    pub specified_date: DateTime<Utc>,
    /// Acceptance deadline; past this an unmatched bet refunds the requester.
    pub expiration_date: DateTime<Utc>,
    pub requester: AccountId,
    pub acceptor: Option<AccountId>,
    pub status: BetStatus,
    pub winner: Winner,
    pub created_at: DateTime<Utc>,
}
