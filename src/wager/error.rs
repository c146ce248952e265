//! Engine rejection kinds.
//!
//! Every precondition failure is rejected synchronously with no state
//! change. `TransferFailed` is the one failure that can surface mid
//! transition; the engine rolls the whole transition back before
//! returning it.

use std::fmt;

use crate::wager::amount::Amount;
use crate::wager::bet::{BetId, BetStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WagerError {
    /// Caller is not the party this operation is restricted to.
    PermissionDenied,
    /// Transition attempted from a status that does not allow it.
    InvalidState { status: BetStatus },
    /// Timestamp precondition failed: the relevant deadline has passed.
    Expired,
    /// Timestamp precondition failed: the relevant date has not arrived.
    NotYetMatured,
    /// Stake amount does not match the bet exactly.
    ValueMismatch { expected: Amount, got: Amount },
    /// Pending-bet cap or minimum-stake bound violated.
    LimitExceeded(String),
    /// Creation dates are mis-ordered (expiration must precede the
    /// specified date).
    InvalidSchedule(String),
    /// Outbound payment was rejected; the transition was rolled back.
    TransferFailed(String),
    /// Unknown bet id.
    NotFound(BetId),
    /// The upstream price aggregator could not be reached or parsed.
    FeedUnavailable(String),
}

impl fmt::Display for WagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WagerError::PermissionDenied => write!(f, "caller is not permitted"),
            WagerError::InvalidState { status } => {
                write!(f, "operation not allowed from status {}", status.as_str())
            }
            WagerError::Expired => write!(f, "deadline has passed"),
            WagerError::NotYetMatured => write!(f, "date has not arrived yet"),
            WagerError::ValueMismatch { expected, got } => {
                write!(f, "stake mismatch: expected {} got {}", expected, got)
            }
            WagerError::LimitExceeded(reason) => write!(f, "limit exceeded: {}", reason),
            WagerError::InvalidSchedule(reason) => write!(f, "invalid schedule: {}", reason),
            WagerError::TransferFailed(reason) => write!(f, "transfer failed: {}", reason),
            WagerError::NotFound(id) => write!(f, "bet {} not found", id),
            WagerError::FeedUnavailable(reason) => write!(f, "price feed unavailable: {}", reason),
        }
    }
}

impl std::error::Error for WagerError {}
