// =============================================================================
// CachedProvider — TTL memoisation in front of any provider
// =============================================================================
//
// Keyed by (symbol, period, interval). A hit within `ttl` returns a clone of
// the stored series; callers cannot tell it apart from a fresh fetch. Errors
// are never stored so a transient failure is retried on the next scan.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{BarSeries, MarketDataProvider};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    symbol: String,
    period: String,
    interval: String,
}

pub struct CachedProvider {
    inner: Arc<dyn MarketDataProvider>,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, BarSeries)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn MarketDataProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Drop every entry older than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .lock()
            .retain(|_, (stored, _)| stored.elapsed() < ttl);
    }

    fn get_fresh(&self, key: &CacheKey) -> Option<BarSeries> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, series)| series.clone())
    }
}

#[async_trait]
impl MarketDataProvider for CachedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_bars(&self, symbol: &str, period: &str, interval: &str) -> Result<BarSeries> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
        };

        if let Some(series) = self.get_fresh(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(symbol, period, interval, "cache hit");
            return Ok(series);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let series = self.inner.fetch_bars(symbol, period, interval).await?;
        self.purge_expired();
        self.entries
            .lock()
            .insert(key, (Instant::now(), series.clone()));
        Ok(series)
    }
}
