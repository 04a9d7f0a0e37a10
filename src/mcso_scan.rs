// =============================================================================
// MCSO Scan — where the latest close sits inside the trailing monthly range
// =============================================================================
//
// Uses about one month of daily bars. Index symbols (leading `^`) often come
// back with gaps, so three months are fetched and the last 22 bars kept.
// =============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::TickerRecord;
use crate::indicators::mcso::calculate_mcso;
use crate::market_data::{fetch_checked, BarRequest, MarketDataProvider};
use crate::runtime_config::ScannerConfig;
use crate::scanner::{ScanRow, Strategy};
use crate::types::{Direction, ScanMode, Timeframe};

const PERIOD: &str = "1mo";
const INDEX_PERIOD: &str = "3mo";
const INDEX_TRAILING_BARS: usize = 22;
const MIN_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum McsoStatus {
    Bullish,
    Bearish,
    #[serde(rename = "Data Error")]
    DataError,
    #[serde(rename = "Calc Error")]
    CalcError,
    #[serde(rename = "Error")]
    Error,
}

impl McsoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::DataError => "Data Error",
            Self::CalcError => "Calc Error",
            Self::Error => "Error",
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Self::Bullish | Self::Bearish)
    }
}

impl std::fmt::Display for McsoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of an MCSO scan.
#[derive(Debug, Clone, Serialize)]
pub struct McsoResult {
    pub ticker: String,
    pub name: String,
    pub category: String,
    pub status: McsoStatus,
    pub mcso: Option<f64>,
    pub price: Option<f64>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl McsoResult {
    pub fn failed(ticker: &TickerRecord, status: McsoStatus, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            status,
            mcso: None,
            price: None,
            range_low: None,
            range_high: None,
            error: Some(reason.into()),
        }
    }
}

impl ScanRow for McsoResult {
    fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    fn bias(&self) -> Option<Direction> {
        match self.status {
            McsoStatus::Bullish => Some(Direction::Long),
            McsoStatus::Bearish => Some(Direction::Short),
            _ => None,
        }
    }

    fn sort_value(&self) -> Option<f64> {
        self.mcso
    }
}

/// Ordering choices offered for MCSO tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McsoSort {
    #[default]
    McsoDesc,
    McsoAsc,
    NameAsc,
    NameDesc,
    Category,
}

impl std::str::FromStr for McsoSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mcso_desc" | "mcso" => Ok(Self::McsoDesc),
            "mcso_asc" => Ok(Self::McsoAsc),
            "name_asc" | "name" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "category" => Ok(Self::Category),
            other => anyhow::bail!("unknown MCSO sort '{other}'"),
        }
    }
}

/// Sort MCSO rows in place. Rows without a value always go last.
pub fn sort_mcso(rows: &mut [McsoResult], order: McsoSort) {
    let by_value = |a: &McsoResult, b: &McsoResult, asc: bool| match (a.mcso, b.mcso) {
        (Some(x), Some(y)) if asc => x.total_cmp(&y),
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    };

    match order {
        McsoSort::McsoDesc => rows.sort_by(|a, b| by_value(a, b, false)),
        McsoSort::McsoAsc => rows.sort_by(|a, b| by_value(a, b, true)),
        McsoSort::NameAsc => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        McsoSort::NameDesc => rows.sort_by(|a, b| b.name.cmp(&a.name)),
        McsoSort::Category => rows.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| by_value(a, b, false))
        }),
    }
}

pub struct McsoStrategy;

#[async_trait]
impl Strategy for McsoStrategy {
    type Output = McsoResult;

    fn mode(&self) -> ScanMode {
        ScanMode::Mcso
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &TickerRecord,
        config: &ScannerConfig,
    ) -> McsoResult {
        let is_index = ticker.symbol.starts_with('^');
        let period = if is_index { INDEX_PERIOD } else { PERIOD };
        let request = BarRequest::new(Timeframe::Daily, period, MIN_BARS);

        let mut series = match fetch_checked(provider, &ticker.symbol, &request).await {
            Ok(Some(series)) => series,
            Ok(None) => {
                return McsoResult::failed(
                    ticker,
                    McsoStatus::DataError,
                    format!("fewer than {MIN_BARS} daily bars"),
                )
            }
            Err(e) => {
                warn!(symbol = %ticker.symbol, error = %e, "fetch failed");
                return McsoResult::failed(ticker, McsoStatus::Error, format!("{e:#}"));
            }
        };

        if is_index {
            series.truncate_front(INDEX_TRAILING_BARS);
        }

        let Some(reading) = calculate_mcso(
            &series.highs(),
            &series.lows(),
            &series.closes(),
            config.mcso_window,
        ) else {
            return McsoResult::failed(ticker, McsoStatus::CalcError, "MCSO not computable");
        };

        let status = if reading.mcso >= config.mcso_threshold {
            McsoStatus::Bullish
        } else {
            McsoStatus::Bearish
        };

        debug!(symbol = %ticker.symbol, mcso = reading.mcso, %status, "MCSO evaluated");

        McsoResult {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            status,
            mcso: Some(reading.mcso),
            price: Some(reading.close),
            range_low: Some(reading.range_low),
            range_high: Some(reading.range_high),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::market_data::provider::fakes::FakeProvider;
    use crate::scanner::ScanSummary;

    fn ticker(symbol: &str, name: &str, category: &str) -> TickerRecord {
        TickerRecord {
            symbol: symbol.into(),
            name: name.into(),
            category: category.into(),
        }
    }

    fn row(name: &str, category: &str, mcso: Option<f64>) -> McsoResult {
        McsoResult {
            mcso,
            status: if mcso.is_some() { McsoStatus::Bullish } else { McsoStatus::DataError },
            ..McsoResult::failed(&ticker(name, name, category), McsoStatus::DataError, "")
        }
    }

    #[tokio::test]
    async fn rising_closes_are_bullish() {
        let closes: Vec<f64> = (0..22).map(|i| 10.0 + i as f64).collect();
        let provider = FakeProvider::default().with("AAA", "1d", closes);
        let r = McsoStrategy
            .evaluate(&provider, &ticker("AAA", "A", "X"), &ScannerConfig::default())
            .await;
        assert_eq!(r.status, McsoStatus::Bullish);
        assert!(r.mcso.unwrap() > 90.0);
    }

    #[tokio::test]
    async fn falling_closes_are_bearish() {
        let closes: Vec<f64> = (0..22).map(|i| 40.0 - i as f64).collect();
        let provider = FakeProvider::default().with("AAA", "1d", closes);
        let r = McsoStrategy
            .evaluate(&provider, &ticker("AAA", "A", "X"), &ScannerConfig::default())
            .await;
        assert_eq!(r.status, McsoStatus::Bearish);
        assert!(r.mcso.unwrap() < 10.0);
    }

    #[tokio::test]
    async fn fewer_than_five_bars_is_data_error() {
        let provider = FakeProvider::default().with("AAA", "1d", vec![1.0, 2.0, 3.0, 4.0]);
        let r = McsoStrategy
            .evaluate(&provider, &ticker("AAA", "A", "X"), &ScannerConfig::default())
            .await;
        assert_eq!(r.status, McsoStatus::DataError);
        assert!(r.mcso.is_none());
    }

    #[tokio::test]
    async fn threshold_is_configurable() {
        // Flat closes inside a 1% band put the close mid-range.
        let provider = FakeProvider::default().with("AAA", "1d", vec![5.0; 20]);
        let t = ticker("AAA", "A", "X");

        let mut config = ScannerConfig::default();
        config.mcso_threshold = 40.0;
        let r = McsoStrategy.evaluate(&provider, &t, &config).await;
        assert!((r.mcso.unwrap() - 50.0).abs() < 1e-6);
        assert_eq!(r.status, McsoStatus::Bullish);

        config.mcso_threshold = 60.0;
        let r = McsoStrategy.evaluate(&provider, &t, &config).await;
        assert_eq!(r.status, McsoStatus::Bearish);
    }

    #[tokio::test]
    async fn index_symbols_use_trailing_22_bars() {
        // A spike 40 bars ago must fall outside the trimmed window.
        let mut closes = vec![500.0];
        closes.extend((0..40).map(|i| 10.0 + i as f64 * 0.1));
        let provider = Arc::new(FakeProvider::default().with("^IDX", "1d", closes));
        let config = ScannerConfig {
            mcso_window: 100,
            ..ScannerConfig::default()
        };
        let r = McsoStrategy
            .evaluate(provider.as_ref(), &ticker("^IDX", "Index", "INDICES"), &config)
            .await;
        assert!(r.range_high.unwrap() < 20.0);
        assert_eq!(r.status, McsoStatus::Bullish);
    }

    #[test]
    fn sort_orders() {
        let mut rows = vec![
            row("Bravo", "B", Some(30.0)),
            row("Alpha", "A", Some(80.0)),
            row("Charlie", "A", None),
        ];

        sort_mcso(&mut rows, McsoSort::McsoDesc);
        assert_eq!(rows[0].name, "Alpha");
        assert_eq!(rows[2].name, "Charlie");

        sort_mcso(&mut rows, McsoSort::McsoAsc);
        assert_eq!(rows[0].name, "Bravo");
        assert_eq!(rows[2].name, "Charlie");

        sort_mcso(&mut rows, McsoSort::NameDesc);
        assert_eq!(rows[0].name, "Charlie");

        sort_mcso(&mut rows, McsoSort::Category);
        assert_eq!(rows[0].name, "Alpha");
        assert_eq!(rows[2].name, "Bravo");
    }

    #[test]
    fn summary_counts_bullish_and_bearish() {
        let mut bear = row("B", "X", Some(10.0));
        bear.status = McsoStatus::Bearish;
        let rows = vec![row("A", "X", Some(70.0)), bear, row("C", "X", None)];
        let s = ScanSummary::from_rows(ScanMode::Mcso, &rows);
        assert_eq!((s.long, s.short, s.errors), (1, 1, 1));
    }

    #[test]
    fn sort_parses() {
        assert_eq!("mcso-asc".parse::<McsoSort>().unwrap(), McsoSort::McsoAsc);
        assert!("volume".parse::<McsoSort>().is_err());
    }
}
