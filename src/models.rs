use uuid::Uuid;

use crate::wager::amount::{to_amount, Amount};
use crate::wager::bank::AccountId;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Identity allowed to run restricted operations (fee changes,
    /// price refresh, fee withdrawal).
    pub admin_account: AccountId,
    pub fee_percentage: u8,
    pub max_pending_bets: u32,
    pub min_stake: Amount,
    /// Interval for the periodic expiry/settlement sweep.
    pub check_interval_secs: u64,
    /// Refresh the price snapshot before each sweep.
    pub auto_refresh_prices: bool,
    /// Override for the aggregator base URL (tests, proxies).
    pub binance_api_base: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        // A fixed admin id survives restarts; otherwise mint one per run.
        let admin_account = std::env::var("ADMIN_ACCOUNT")
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .unwrap_or_else(Uuid::new_v4);

        let fee_percentage = std::env::var("FEE_PERCENTAGE")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);
        anyhow::ensure!(fee_percentage <= 100, "FEE_PERCENTAGE must be 0-100");

        let max_pending_bets = std::env::var("MAX_PENDING_BETS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let min_stake = to_amount(
            std::env::var("MIN_STAKE")
                .unwrap_or_else(|_| "0.001".to_string())
                .parse()
                .unwrap_or(0.001),
        );

        let check_interval_secs = std::env::var("CHECK_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let auto_refresh_prices = std::env::var("AUTO_REFRESH_PRICES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(true);

        let binance_api_base = std::env::var("BINANCE_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            port,
            admin_account,
            fee_percentage,
            max_pending_bets,
            min_stake,
            check_interval_secs,
            auto_refresh_prices,
            binance_api_base,
        })
    }
}
