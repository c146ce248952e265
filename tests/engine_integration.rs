//! End-to-end lifecycle test through the public library API: fund two
//! accounts, run a bet from creation through acceptance to settlement, and
//! verify every balance to the sub-unit.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use peerbet_backend::scrapers::{PriceAggregator, PriceBoard};
use peerbet_backend::wager::{
    to_amount, Bank, BetEngine, BetStatus, EngineSettings, InMemoryBank, ManualClock, Price, Token,
    Winner, PRICE_SCALE, TOKEN_COUNT,
};

/// Aggregator wired to a fixed tape, standing in for the external feed.
struct TapeAggregator([Price; TOKEN_COUNT]);

#[async_trait]
impl PriceAggregator for TapeAggregator {
    async fn fetch_price(&self, token: Token) -> Result<Price> {
        Ok(self.0[token.index()])
    }
}

#[tokio::test]
async fn full_lifecycle_btc_scenario() {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let clock = Arc::new(ManualClock::new(t0));
    let bank = Arc::new(InMemoryBank::new());

    let mut tape = [0 as Price; TOKEN_COUNT];
    tape[Token::Btc.index()] = 21_000 * PRICE_SCALE;
    let board = Arc::new(PriceBoard::new(Arc::new(TapeAggregator(tape))));

    let admin = Uuid::new_v4();
    let requester = Uuid::new_v4();
    let acceptor = Uuid::new_v4();
    bank.deposit(requester, to_amount(0.05));
    bank.deposit(acceptor, to_amount(0.05));

    let engine = BetEngine::new(
        admin,
        EngineSettings {
            fee_percentage: 2,
            max_pending_bets: 5,
            min_stake: to_amount(0.001),
        },
        bank.clone(),
        board.clone(),
        clock.clone(),
    );

    // Admin refreshes the snapshot from the aggregator.
    engine.refresh_prices(admin).await.expect("refresh");
    assert_eq!(
        engine.token_prices()[Token::Btc.index()],
        21_000 * PRICE_SCALE
    );

    // Requester predicts BTC above 20000 by T+100, accepting until T+50.
    let bet_id = engine
        .create_bet(
            requester,
            to_amount(0.01),
            Token::Btc,
            20_000,
            true,
            t0 + Duration::seconds(100),
            t0 + Duration::seconds(50),
        )
        .expect("create");
    assert_eq!(bet_id, 1);
    assert_eq!(engine.pending_count(requester), 1);

    engine
        .accept_bet(bet_id, acceptor, to_amount(0.01))
        .expect("accept");
    assert_eq!(engine.get_bet(bet_id).unwrap().status, BetStatus::Accepted);
    assert_eq!(engine.pending_count(requester), 0);

    // Nothing to do until maturity.
    assert_eq!(engine.check_bet(bet_id).unwrap(), BetStatus::Accepted);

    clock.advance_to(t0 + Duration::seconds(101));
    assert_eq!(engine.check_bet(bet_id).unwrap(), BetStatus::Completed);

    // Price closed above the prediction and the requester bet "greater":
    // the acceptor takes the pot minus the 2% fee.
    let bet = engine.get_bet(bet_id).unwrap();
    assert_eq!(bet.winner, Winner::Acceptor);
    assert_eq!(bank.balance(acceptor), to_amount(0.05) - to_amount(0.01) + to_amount(0.0198));
    assert_eq!(bank.balance(requester), to_amount(0.04));
    assert_eq!(engine.retained_fees(), to_amount(0.0002));
    assert_eq!(engine.account_record(acceptor).wins, 1);
    assert_eq!(engine.account_record(requester).losses, 1);

    // Re-checking is a no-op; the admin drains the fee.
    assert_eq!(engine.check_bet(bet_id).unwrap(), BetStatus::Completed);
    assert_eq!(engine.withdraw_fees(admin).unwrap(), to_amount(0.0002));
    assert_eq!(bank.balance(admin), to_amount(0.0002));
    assert_eq!(bank.balance(engine.escrow_account()), 0);
}

#[tokio::test]
async fn unmatched_bet_expires_and_refunds() {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let clock = Arc::new(ManualClock::new(t0));
    let bank = Arc::new(InMemoryBank::new());
    let board = Arc::new(PriceBoard::new(Arc::new(TapeAggregator([0; TOKEN_COUNT]))));

    let requester = Uuid::new_v4();
    bank.deposit(requester, to_amount(1.0));

    let engine = BetEngine::new(
        Uuid::new_v4(),
        EngineSettings::default(),
        bank.clone(),
        board,
        clock.clone(),
    );

    let bet_id = engine
        .create_bet(
            requester,
            to_amount(0.25),
            Token::Ada,
            1,
            false,
            t0 + Duration::seconds(3600),
            t0 + Duration::seconds(600),
        )
        .expect("create");
    assert_eq!(bank.balance(requester), to_amount(0.75));

    clock.advance_to(t0 + Duration::seconds(601));
    assert_eq!(engine.sweep(), 1);

    let bet = engine.get_bet(bet_id).unwrap();
    assert_eq!(bet.status, BetStatus::Expired);
    assert_eq!(bet.winner, Winner::Unknown);
    assert_eq!(bank.balance(requester), to_amount(1.0));
    assert_eq!(engine.pending_count(requester), 0);
}
