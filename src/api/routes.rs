//! HTTP surface over the wager engine.
//!
//! Caller identity travels in request bodies as an opaque account id; the
//! engine enforces who may do what. `/ws` streams engine notifications.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::wager::amount::{from_amount, to_amount, Price};
use crate::wager::bank::{AccountId, Bank, InMemoryBank};
use crate::wager::bet::{Bet, BetId, BetStatus, Token, Winner};
use crate::wager::engine::BetEngine;
use crate::wager::error::WagerError;
use crate::wager::events::BetEvent;
use crate::wager::stats::WinLossRecord;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BetEngine>,
    pub bank: Arc<InMemoryBank>,
}

/// Create the API router
pub fn create_router(engine: Arc<BetEngine>, bank: Arc<InMemoryBank>) -> Router {
    let state = AppState { engine, bank };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/bets", post(create_bet).get(list_bets))
        .route("/api/bets/:id", get(get_bet))
        .route("/api/bets/:id/cancel", post(cancel_bet))
        .route("/api/bets/:id/accept", post(accept_bet))
        .route("/api/bets/:id/check", post(check_bet))
        .route("/api/prices", get(get_prices))
        .route("/api/accounts/:id/record", get(get_account_record))
        .route("/api/accounts/:id/balance", get(get_balance))
        .route("/api/accounts/:id/deposit", post(deposit))
        .route("/api/admin/prices/refresh", post(refresh_prices))
        .route("/api/admin/fee", put(set_fee))
        .route("/api/admin/max-pending", put(set_max_pending))
        .route("/api/admin/fees/withdraw", post(withdraw_fees))
        .route("/ws", get(ws_events))
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_bet(
    State(state): State<AppState>,
    Json(req): Json<CreateBetRequest>,
) -> Result<Json<CreateBetResponse>, ApiError> {
    let bet_id = state.engine.create_bet(
        req.requester,
        to_amount(req.amount),
        req.token,
        req.predicted_price,
        req.is_gt,
        req.specified_date,
        req.expiration_date,
    )?;
    Ok(Json(CreateBetResponse { bet_id }))
}

async fn list_bets(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Json<BetsResponse> {
    let limit = params.limit.unwrap_or(50).min(500) as usize;
    let bets: Vec<BetView> = state
        .engine
        .recent_bets(limit)
        .iter()
        .map(BetView::from)
        .collect();
    Json(BetsResponse {
        count: bets.len(),
        total: state.engine.bet_count(),
        bets,
    })
}

async fn get_bet(
    State(state): State<AppState>,
    Path(id): Path<BetId>,
) -> Result<Json<BetView>, ApiError> {
    let bet = state.engine.get_bet(id)?;
    Ok(Json(BetView::from(&bet)))
}

async fn cancel_bet(
    State(state): State<AppState>,
    Path(id): Path<BetId>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.engine.cancel_bet(id, req.caller)?;
    Ok(Json(StatusResponse {
        bet_id: id,
        status: BetStatus::Canceled,
    }))
}

async fn accept_bet(
    State(state): State<AppState>,
    Path(id): Path<BetId>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .engine
        .accept_bet(id, req.caller, to_amount(req.amount))?;
    Ok(Json(StatusResponse {
        bet_id: id,
        status: BetStatus::Accepted,
    }))
}

async fn check_bet(
    State(state): State<AppState>,
    Path(id): Path<BetId>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.engine.check_bet(id)?;
    Ok(Json(StatusResponse { bet_id: id, status }))
}

async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let prices = state.engine.token_prices();
    Json(PricesResponse {
        prices: Token::ALL
            .iter()
            .map(|t| TokenPrice {
                token: *t,
                price: prices[t.index()],
            })
            .collect(),
    })
}

async fn get_account_record(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Json<RecordResponse> {
    Json(RecordResponse {
        account: id,
        record: state.engine.account_record(id),
    })
}

async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        account: id,
        balance: from_amount(state.bank.balance(id)),
    })
}

/// Faucet for the in-process bank; the real account/value layer lives
/// outside this service.
async fn deposit(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    if req.amount <= 0.0 {
        return Err(ApiError::BadRequest("deposit must be positive".to_string()));
    }
    state.bank.deposit(id, to_amount(req.amount));
    Ok(Json(BalanceResponse {
        account: id,
        balance: from_amount(state.bank.balance(id)),
    }))
}

async fn refresh_prices(
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> Result<StatusCode, ApiError> {
    state.engine.refresh_prices(req.caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_fee(
    State(state): State<AppState>,
    Json(req): Json<SetFeeRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .set_fee_percentage(req.caller, req.fee_percentage)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_max_pending(
    State(state): State<AppState>,
    Json(req): Json<SetMaxPendingRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .set_max_pending_bets(req.caller, req.max_pending_bets)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn withdraw_fees(
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let withdrawn = state.engine.withdraw_fees(req.caller)?;
    Ok(Json(WithdrawResponse {
        withdrawn: from_amount(withdrawn),
    }))
}

/// Stream engine notifications to a WebSocket client.
async fn ws_events(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let rx = state.engine.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, rx))
}

async fn forward_events(mut socket: WebSocket, mut rx: broadcast::Receiver<BetEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(ev) => {
                    let Ok(text) = serde_json::to_string(&ev) else { continue };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                // A slow client skips missed events rather than dying.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(_)) => continue,
                _ => break,
            },
        }
    }
}

// ===== Request/Response Types =====

#[derive(Deserialize)]
struct CreateBetRequest {
    requester: AccountId,
    /// Stake in display units.
    amount: f64,
    token: Token,
    predicted_price: u64,
    is_gt: bool,
    specified_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
}

#[derive(Serialize)]
struct CreateBetResponse {
    bet_id: BetId,
}

#[derive(Deserialize)]
struct CallerRequest {
    caller: AccountId,
}

#[derive(Deserialize)]
struct AcceptRequest {
    caller: AccountId,
    amount: f64,
}

#[derive(Deserialize)]
struct DepositRequest {
    amount: f64,
}

#[derive(Deserialize)]
struct SetFeeRequest {
    caller: AccountId,
    fee_percentage: u8,
}

#[derive(Deserialize)]
struct SetMaxPendingRequest {
    caller: AccountId,
    max_pending_bets: u32,
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
struct StatusResponse {
    bet_id: BetId,
    status: BetStatus,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Bet with the stake rendered in display units.
#[derive(Serialize)]
struct BetView {
    id: BetId,
    amount: f64,
    token: Token,
    predicted_price: u64,
    is_gt: bool,
    specified_date: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
    requester: AccountId,
    acceptor: Option<AccountId>,
    status: BetStatus,
    winner: Winner,
    created_at: DateTime<Utc>,
}

impl From<&Bet> for BetView {
    fn from(bet: &Bet) -> Self {
        Self {
            id: bet.id,
            amount: from_amount(bet.amount),
            token: bet.token,
            predicted_price: bet.predicted_price,
            is_gt: bet.is_gt,
            specified_date: bet.specified_date,
            expiration_date: bet.expiration_date,
            requester: bet.requester,
            acceptor: bet.acceptor,
            status: bet.status,
            winner: bet.winner,
            created_at: bet.created_at,
        }
    }
}

#[derive(Serialize)]
struct BetsResponse {
    count: usize,
    total: usize,
    bets: Vec<BetView>,
}

#[derive(Serialize)]
struct TokenPrice {
    token: Token,
    price: Price,
}

#[derive(Serialize)]
struct PricesResponse {
    prices: Vec<TokenPrice>,
}

#[derive(Serialize)]
struct RecordResponse {
    account: AccountId,
    record: WinLossRecord,
}

#[derive(Serialize)]
struct BalanceResponse {
    account: AccountId,
    balance: f64,
}

#[derive(Serialize)]
struct WithdrawResponse {
    withdrawn: f64,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    Engine(WagerError),
    BadRequest(String),
}

impl From<WagerError> for ApiError {
    fn from(err: WagerError) -> Self {
        ApiError::Engine(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => match err {
                WagerError::NotFound(_) => StatusCode::NOT_FOUND,
                WagerError::PermissionDenied => StatusCode::FORBIDDEN,
                WagerError::InvalidState { .. }
                | WagerError::Expired
                | WagerError::NotYetMatured => StatusCode::CONFLICT,
                WagerError::ValueMismatch { .. }
                | WagerError::LimitExceeded(_)
                | WagerError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
                WagerError::TransferFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WagerError::FeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(err) => {
                if status.is_server_error() {
                    tracing::error!("Engine error: {}", err);
                }
                err.to_string()
            }
            ApiError::BadRequest(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
