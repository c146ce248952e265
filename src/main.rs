//! PeerBet - Peer-to-Peer Crypto Price Wagering Service
//!
//! Two parties stake equal value on where an asset's price closes relative
//! to a prediction. Stakes are escrowed by the engine, bets resolve against
//! a cached price snapshot, winners are paid minus the protocol fee.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{net::TcpListener, time::interval};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peerbet_backend::{
    api,
    middleware::request_logging,
    models::Config,
    scrapers::{BinanceAggregator, PriceBoard},
    wager::{BetEngine, EngineSettings, InMemoryBank, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "peerbet", about = "Peer-to-peer price wagering service")]
struct Cli {
    /// Listen port
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    info!("🎲 PeerBet wagering engine starting");
    info!(admin = %config.admin_account, "admin identity loaded");

    let bank = Arc::new(InMemoryBank::new());
    let aggregator = Arc::new(BinanceAggregator::new(config.binance_api_base.clone())?);
    let prices = Arc::new(PriceBoard::new(aggregator));

    let engine = Arc::new(BetEngine::new(
        config.admin_account,
        EngineSettings {
            fee_percentage: config.fee_percentage,
            max_pending_bets: config.max_pending_bets,
            min_stake: config.min_stake,
        },
        bank.clone(),
        prices.clone(),
        Arc::new(SystemClock),
    ));

    // Warm the snapshot so settlement has prices before the first sweep.
    if config.auto_refresh_prices {
        if let Err(e) = prices.refresh().await {
            warn!("Initial price refresh failed: {e}");
        }
    }

    // Periodic expiry/settlement sweep. The engine itself never
    // self-schedules; this loop is the administrative trigger.
    tokio::spawn(check_polling(engine.clone(), prices.clone(), config.clone()));

    let app = api::create_router(engine, bank)
        .layer(axum::middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn check_polling(engine: Arc<BetEngine>, prices: Arc<PriceBoard>, config: Config) {
    info!(
        interval_secs = config.check_interval_secs,
        "Starting expiry/settlement sweep"
    );
    let mut ticker = interval(Duration::from_secs(config.check_interval_secs.max(1)));

    loop {
        ticker.tick().await;

        if config.auto_refresh_prices {
            if let Err(e) = prices.refresh().await {
                warn!("Price refresh failed, sweeping with cached snapshot: {e}");
            }
        }

        let transitions = engine.sweep();
        if transitions > 0 {
            info!(transitions, "Sweep applied transitions");
        }
    }
}

/// Initialize tracing with env-filter overrides
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,peerbet_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    let _ = dotenv::dotenv();
}
