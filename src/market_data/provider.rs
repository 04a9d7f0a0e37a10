// =============================================================================
// Market-data provider abstraction
// =============================================================================
//
// Every source of historical bars implements `MarketDataProvider`. The scanner
// only ever holds an `Arc<dyn MarketDataProvider>`, so the HTTP client, the
// cache wrapper and test fakes are interchangeable.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::BarSeries;
use crate::types::Timeframe;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fetch bars for `symbol` covering `period` (e.g. "5y") at `interval`
    /// (e.g. "1wk"). An `Err` means the provider failed outright; an empty
    /// series means it answered with no data.
    async fn fetch_bars(&self, symbol: &str, period: &str, interval: &str) -> Result<BarSeries>;
}

/// One timeframe request with its minimum acceptable length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    pub timeframe: Timeframe,
    pub period: String,
    pub min_bars: usize,
}

impl BarRequest {
    pub fn new(timeframe: Timeframe, period: impl Into<String>, min_bars: usize) -> Self {
        Self {
            timeframe,
            period: period.into(),
            min_bars,
        }
    }
}

/// Fetch and length-check a series.
///
/// Returns `Ok(None)` when the provider answered but the series is empty or
/// shorter than `request.min_bars`. Provider failures propagate as `Err`.
pub async fn fetch_checked(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    request: &BarRequest,
) -> Result<Option<BarSeries>> {
    let series = provider
        .fetch_bars(symbol, &request.period, request.timeframe.interval())
        .await?;

    if series.len() < request.min_bars.max(1) {
        debug!(
            symbol,
            timeframe = %request.timeframe,
            bars = series.len(),
            required = request.min_bars,
            "series too short"
        );
        return Ok(None);
    }

    Ok(Some(series))
}

// =============================================================================
// Test fakes
// =============================================================================
