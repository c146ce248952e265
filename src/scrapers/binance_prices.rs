//! Binance spot price adapter.
//!
//! `BinanceAggregator` pulls per-token spot prices over REST;
//! `PriceBoard` holds the cached snapshot that settlement reads. The
//! snapshot is only replaced by an admin-triggered refresh, so settlement
//! never makes an external call — price staleness between refreshes is a
//! known, accepted property.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::wager::amount::{to_price, Price};
use crate::wager::bet::{Token, TOKEN_COUNT};

const BINANCE_API_BASE: &str = "https://api.binance.com/api/v3";

/// External price source: one signed fixed-point price per token.
#[async_trait]
pub trait PriceAggregator: Send + Sync {
    async fn fetch_price(&self, token: Token) -> Result<Price>;
}

#[derive(Clone)]
pub struct BinanceAggregator {
    client: Client,
    base_url: String,
}

impl BinanceAggregator {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build BinanceAggregator client")?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| BINANCE_API_BASE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[allow(dead_code)]
    symbol: String,
    /// Decimal string, e.g. "64213.51000000".
    price: String,
}

#[async_trait]
impl PriceAggregator for BinanceAggregator {
    async fn fetch_price(&self, token: Token) -> Result<Price> {
        let symbol = token.pair_symbol();
        let url = format!("{}/ticker/price", self.base_url);

        let resp = self
            .client
            .get(url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .with_context(|| format!("GET /ticker/price {} failed", symbol))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("GET /ticker/price {}: {}", status, text));
        }

        let ticker = resp
            .json::<TickerPrice>()
            .await
            .context("Failed to parse ticker price response")?;

        let value: f64 = ticker
            .price
            .parse()
            .with_context(|| format!("Unparseable price for {}: {}", symbol, ticker.price))?;

        Ok(to_price(value))
    }
}

/// Cached price snapshot for all supported tokens.
///
/// Unrefreshed entries read as zero, matching the storage default of the
/// upstream feed.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    pub prices: [Price; TOKEN_COUNT],
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self {
            prices: [0; TOKEN_COUNT],
            refreshed_at: None,
        }
    }
}

pub struct PriceBoard {
    snapshot: RwLock<PriceSnapshot>,
    aggregator: Arc<dyn PriceAggregator>,
}

impl PriceBoard {
    pub fn new(aggregator: Arc<dyn PriceAggregator>) -> Self {
        Self {
            snapshot: RwLock::new(PriceSnapshot::default()),
            aggregator,
        }
    }

    /// Pull all token prices and swap the snapshot in one motion. Any
    /// fetch failure leaves the previous snapshot in place.
    pub async fn refresh(&self) -> Result<()> {
        let mut prices = [0 as Price; TOKEN_COUNT];
        for token in Token::ALL {
            prices[token.index()] = self.aggregator.fetch_price(token).await?;
        }

        let mut snapshot = self.snapshot.write();
        snapshot.prices = prices;
        snapshot.refreshed_at = Some(Utc::now());
        debug!(?prices, "price snapshot refreshed");
        Ok(())
    }

    /// Pure lookup into the cached snapshot, no external call.
    #[inline]
    pub fn price(&self, token: Token) -> Price {
        self.snapshot.read().prices[token.index()]
    }

    pub fn all_prices(&self) -> [Price; TOKEN_COUNT] {
        self.snapshot.read().prices
    }

    pub fn snapshot(&self) -> PriceSnapshot {
        self.snapshot.read().clone()
    }

    /// Install a snapshot directly (bootstrap and tests).
    pub fn seed(&self, prices: [Price; TOKEN_COUNT]) {
        let mut snapshot = self.snapshot.write();
        snapshot.prices = prices;
        snapshot.refreshed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAggregator([Price; TOKEN_COUNT]);

    #[async_trait]
    impl PriceAggregator for FixedAggregator {
        async fn fetch_price(&self, token: Token) -> Result<Price> {
            Ok(self.0[token.index()])
        }
    }

    struct FailingAggregator;

    #[async_trait]
    impl PriceAggregator for FailingAggregator {
        async fn fetch_price(&self, _token: Token) -> Result<Price> {
            Err(anyhow::anyhow!("upstream down"))
        }
    }

    #[tokio::test]
    async fn test_refresh_swaps_whole_snapshot() {
        let prices = [1, 2, 3, 4, 5, 6];
        let board = PriceBoard::new(Arc::new(FixedAggregator(prices)));

        assert_eq!(board.all_prices(), [0; TOKEN_COUNT]);
        assert!(board.snapshot().refreshed_at.is_none());

        board.refresh().await.unwrap();
        assert_eq!(board.all_prices(), prices);
        assert_eq!(board.price(Token::Eth), 2);
        assert!(board.snapshot().refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let board = PriceBoard::new(Arc::new(FailingAggregator));
        board.seed([7; TOKEN_COUNT]);

        assert!(board.refresh().await.is_err());
        assert_eq!(board.all_prices(), [7; TOKEN_COUNT]);
    }
}
