pub mod bar;
pub mod cache;
pub mod provider;
pub mod yahoo;

// Re-exports for convenient access (e.g. `use crate::market_data::BarSeries`).
pub use bar::{Bar, BarSeries};
pub use cache::CachedProvider;
pub use provider::{fetch_checked, BarRequest, MarketDataProvider};
pub use yahoo::YahooClient;
