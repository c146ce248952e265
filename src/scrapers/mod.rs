pub mod binance_prices; // Binance spot price aggregator + cached snapshot

pub use binance_prices::{BinanceAggregator, PriceAggregator, PriceBoard, PriceSnapshot};
