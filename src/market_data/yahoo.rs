// =============================================================================
// Yahoo Finance chart client
// =============================================================================
//
// Talks to the public v8 chart endpoint:
//
//   GET {base}/v8/finance/chart/{symbol}?range={period}&interval={interval}
//
// Rows where any of open/high/low/close is null (holidays, halted sessions)
// are dropped. A `chart.error` payload or a non-2xx status is an error.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Bar, BarSeries, MarketDataProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) setup-scanner/1.0";

/// HTTP client for the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Full chart URL with the symbol as one path segment. Characters that
    /// would split or end the path (`/`, `?`, `#`, spaces) are escaped; index
    /// and futures markers such as `^GSPC` or `GC=F` pass through as is.
    pub fn chart_url(&self, symbol: &str, period: &str, interval: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid provider base url '{}'", self.base_url))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("provider base url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        url.query_pairs_mut()
            .append_pair("range", period)
            .append_pair("interval", interval);

        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self), name = "yahoo::fetch_bars")]
    async fn fetch_bars(&self, symbol: &str, period: &str, interval: &str) -> Result<BarSeries> {
        let url = self.chart_url(symbol, period, interval)?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET chart for {symbol} failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read chart body for {symbol}"))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ChartEnvelope>(&body)
                .ok()
                .and_then(|env| env.chart.error)
                .map(|e| e.to_string())
                .unwrap_or_else(|| body.chars().take(200).collect());
            bail!("Yahoo chart for {symbol} returned {status}: {detail}");
        }

        let series = parse_chart(symbol, period, interval, &body)?;
        debug!(symbol, interval, bars = series.len(), "chart retrieved");
        Ok(series)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decode a chart response body into a `BarSeries`.
///
/// A missing `result` (with no error) yields an empty series, which the
/// scanner reports as a data error rather than a provider failure.
pub fn parse_chart(symbol: &str, period: &str, interval: &str, body: &str) -> Result<BarSeries> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .with_context(|| format!("failed to parse chart response for {symbol}"))?;

    if let Some(err) = envelope.chart.error {
        bail!("Yahoo chart error for {symbol}: {err}");
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(BarSeries::new(symbol, period, interval, Vec::new()));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            Some(Bar {
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: at(&quote.open, i)?,
                high: at(&quote.high, i)?,
                low: at(&quote.low, i)?,
                close: at(&quote.close, i)?,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(BarSeries::new(symbol, period, interval, bars))
}
