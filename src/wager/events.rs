//! Engine notifications, fanned out on a broadcast channel and forwarded
//! to WebSocket subscribers by the API layer.

use serde::Serialize;

use crate::wager::bank::AccountId;
use crate::wager::bet::{BetId, BetStatus, Token, Winner};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetEvent {
    BetCreated {
        bet_id: BetId,
        requester: AccountId,
        token: Token,
        /// Stake as a display value.
        amount: f64,
    },
    BetCanceled {
        bet_id: BetId,
    },
    BetAccepted {
        bet_id: BetId,
        acceptor: AccountId,
    },
    /// Emitted on expiry and completion.
    BetStatusChanged {
        bet_id: BetId,
        status: BetStatus,
        winner: Option<Winner>,
    },
}

impl BetEvent {
    pub fn bet_id(&self) -> BetId {
        match self {
            BetEvent::BetCreated { bet_id, .. }
            | BetEvent::BetCanceled { bet_id }
            | BetEvent::BetAccepted { bet_id, .. }
            | BetEvent::BetStatusChanged { bet_id, .. } => *bet_id,
        }
    }
}
