// =============================================================================
// Scanner — sequential scan loop over a ticker list
// =============================================================================
//
// Pipeline per ticker:
//   1. Fetch the bar series the strategy needs (through the shared provider)
//   2. Compute indicators
//   3. Evaluate and produce one result row
//   4. Report progress
//
// Tickers are processed one at a time in list order. A failing ticker becomes
// an error row; the batch never aborts and nothing is retried.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::TickerRecord;
use crate::evaluator::{SetupResult, SetupStrategy};
use crate::market_data::MarketDataProvider;
use crate::mcso_scan::{McsoResult, McsoStrategy};
use crate::momentum::{MomentumResult, MomentumStrategy};
use crate::runtime_config::ScannerConfig;
use crate::types::{Direction, ScanMode};

// =============================================================================
// Traits
// =============================================================================

/// Common view of a result row, used for summaries and sorting.
pub trait ScanRow {
    /// False for data, calculation and provider failures.
    fn is_valid(&self) -> bool;
    /// Bullish/bearish reading of the row, if it has one.
    fn bias(&self) -> Option<Direction>;
    /// Primary sort value (descending); `None` sorts last.
    fn sort_value(&self) -> Option<f64>;
    /// Whether the row belongs in the default results table.
    fn is_actionable(&self) -> bool {
        self.is_valid()
    }
}

/// One kind of scan. Implementations never fail: every problem is folded
/// into the returned row.
#[async_trait]
pub trait Strategy: Send + Sync {
    type Output: ScanRow + Send;

    fn mode(&self) -> ScanMode;

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &TickerRecord,
        config: &ScannerConfig,
    ) -> Self::Output;
}

// =============================================================================
// Progress / summary
// =============================================================================

/// Reported after every ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub symbol: String,
}

/// Aggregate counts over one scan. Percentages are of the valid rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanSummary {
    pub mode: ScanMode,
    pub total: usize,
    pub valid: usize,
    pub errors: usize,
    pub long: usize,
    pub short: usize,
    pub long_pct: f64,
    pub short_pct: f64,
}

impl ScanSummary {
    pub fn from_rows<R: ScanRow>(mode: ScanMode, rows: &[R]) -> Self {
        let total = rows.len();
        let valid = rows.iter().filter(|r| r.is_valid()).count();
        let long = rows
            .iter()
            .filter(|r| r.is_valid() && r.bias() == Some(Direction::Long))
            .count();
        let short = rows
            .iter()
            .filter(|r| r.is_valid() && r.bias() == Some(Direction::Short))
            .count();

        let pct = |n: usize| {
            if valid == 0 {
                0.0
            } else {
                n as f64 / valid as f64 * 100.0
            }
        };

        Self {
            mode,
            total,
            valid,
            errors: total - valid,
            long,
            short,
            long_pct: pct(long),
            short_pct: pct(short),
        }
    }
}

/// Sort rows by `sort_value` descending; rows without a value go last and
/// ties keep their scan order.
pub fn sort_by_value_desc<R: ScanRow>(rows: &mut [R]) {
    rows.sort_by(|a, b| match (a.sort_value(), b.sort_value()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

// =============================================================================
// Report
// =============================================================================

/// Result rows of one finished scan, tagged by mode.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", content = "rows", rename_all = "lowercase")]
pub enum ScanReport {
    Setup(Vec<SetupResult>),
    Momentum(Vec<MomentumResult>),
    Mcso(Vec<McsoResult>),
}

impl ScanReport {
    pub fn mode(&self) -> ScanMode {
        match self {
            Self::Setup(_) => ScanMode::Setup,
            Self::Momentum(_) => ScanMode::Momentum,
            Self::Mcso(_) => ScanMode::Mcso,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Setup(r) => r.len(),
            Self::Momentum(r) => r.len(),
            Self::Mcso(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> ScanSummary {
        match self {
            Self::Setup(r) => ScanSummary::from_rows(ScanMode::Setup, r),
            Self::Momentum(r) => ScanSummary::from_rows(ScanMode::Momentum, r),
            Self::Mcso(r) => ScanSummary::from_rows(ScanMode::Mcso, r),
        }
    }
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner {
    provider: Arc<dyn MarketDataProvider>,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: ScannerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Apply the configured ticker cap (0 = unlimited).
    fn capped<'a>(&self, tickers: &'a [TickerRecord]) -> &'a [TickerRecord] {
        match self.config.max_tickers {
            0 => tickers,
            cap => &tickers[..cap.min(tickers.len())],
        }
    }

    /// Run `strategy` over `tickers` in order, calling `progress` after each.
    pub async fn scan<S, F>(&self, strategy: &S, tickers: &[TickerRecord], mut progress: F) -> Vec<S::Output>
    where
        S: Strategy,
        F: FnMut(Progress) + Send,
    {
        let tickers = self.capped(tickers);
        let total = tickers.len();
        let started = Instant::now();
        let mut rows = Vec::with_capacity(total);

        info!(mode = %strategy.mode(), total, provider = self.provider.name(), "scan started");

        for (i, ticker) in tickers.iter().enumerate() {
            let row = strategy
                .evaluate(self.provider.as_ref(), ticker, &self.config)
                .await;
            debug!(symbol = %ticker.symbol, valid = row.is_valid(), "ticker scanned");
            rows.push(row);

            progress(Progress {
                done: i + 1,
                total,
                symbol: ticker.symbol.clone(),
            });
        }

        let valid = rows.iter().filter(|r| r.is_valid()).count();
        info!(
            mode = %strategy.mode(),
            total,
            valid,
            errors = total - valid,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );

        rows
    }

    /// Run the scan for `mode` and wrap the rows in a report.
    pub async fn run<F>(&self, mode: ScanMode, tickers: &[TickerRecord], progress: F) -> ScanReport
    where
        F: FnMut(Progress) + Send,
    {
        match mode {
            ScanMode::Setup => ScanReport::Setup(self.scan(&SetupStrategy, tickers, progress).await),
            ScanMode::Momentum => {
                ScanReport::Momentum(self.scan(&MomentumStrategy, tickers, progress).await)
            }
            ScanMode::Mcso => ScanReport::Mcso(self.scan(&McsoStrategy, tickers, progress).await),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::SetupLabel;
    use crate::market_data::provider::fakes::FakeProvider;

    fn ticker(symbol: &str) -> TickerRecord {
        TickerRecord {
            symbol: symbol.into(),
            name: symbol.into(),
            category: "TEST".into(),
        }
    }

    fn trend(n: usize, slope: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 200.0 + i as f64 * slope + (i as f64 / 2.0).sin())
            .collect()
    }

    fn provider() -> Arc<FakeProvider> {
        Arc::new(
            FakeProvider::default()
                .with("UP", "1wk", trend(260, 0.8))
                .with("UP", "1d", trend(250, 0.3))
                .with("UP", "1mo", trend(120, 1.0))
                .with("SHORT", "1wk", trend(10, 0.8))
                .failing("BAD"),
        )
    }

    #[tokio::test]
    async fn scan_keeps_order_and_reports_progress() {
        let fake = provider();
        let scanner = Scanner::new(fake.clone(), ScannerConfig::default());
        let tickers = vec![ticker("UP"), ticker("BAD"), ticker("SHORT")];

        let mut seen = Vec::new();
        let rows = scanner
            .scan(&SetupStrategy, &tickers, |p| seen.push(p))
            .await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].ticker, "UP");
        assert!(rows[0].label.is_valid());
        assert_eq!(rows[1].label, SetupLabel::Error);
        assert_eq!(rows[2].label, SetupLabel::DataError);

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], Progress { done: 3, total: 3, symbol: "SHORT".into() });
    }

    #[tokio::test]
    async fn max_tickers_truncates_the_list() {
        let config = ScannerConfig {
            max_tickers: 2,
            ..ScannerConfig::default()
        };
        let scanner = Scanner::new(provider(), config);
        let tickers = vec![ticker("UP"), ticker("BAD"), ticker("SHORT")];

        let report = scanner.run(ScanMode::Setup, &tickers, |_| {}).await;
        assert_eq!(report.len(), 2);
        assert_eq!(report.mode(), ScanMode::Setup);
    }

    #[tokio::test]
    async fn summary_counts_errors_and_bias() {
        let scanner = Scanner::new(provider(), ScannerConfig::default());
        let tickers = vec![ticker("UP"), ticker("BAD"), ticker("SHORT")];
        let report = scanner.run(ScanMode::Setup, &tickers, |_| {}).await;

        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.errors, 2);
        assert!(summary.long + summary.short <= 1);
    }

    #[test]
    fn summary_of_nothing_has_zero_percentages() {
        let summary = ScanSummary::from_rows::<SetupResult>(ScanMode::Setup, &[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.long_pct, 0.0);
    }

    #[test]
    fn sort_puts_missing_values_last() {
        let t = ticker("X");
        let mut rows = vec![
            SetupResult::failed(&t, SetupLabel::DataError, "short"),
            SetupResult { score: Some(-4), ..SetupResult::failed(&t, SetupLabel::WatchShort, "") },
            SetupResult { score: Some(5), ..SetupResult::failed(&t, SetupLabel::PotentialLong, "") },
        ];
        sort_by_value_desc(&mut rows);
        assert_eq!(rows[0].score, Some(5));
        assert_eq!(rows[1].score, Some(-4));
        assert_eq!(rows[2].score, None);
    }
}
