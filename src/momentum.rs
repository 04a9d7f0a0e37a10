// =============================================================================
// Momentum Scan — daily/weekly RSI bias with daily EMA alignment
// =============================================================================
//
// Quadrants (RSI versus the midline):
//   daily bull + weekly bull → Strongly Bullish
//   daily bear + weekly bull → Pullback
//   daily bull + weekly bear → Caution
//   daily bear + weekly bear → Strongly Bearish
//
// Score = daily RSI + weekly RSI (+ alignment bonus when EMA 7 > 11 > 21).
// An RSI sitting exactly on the midline counts as bearish.
// =============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::TickerRecord;
use crate::indicators::ema::ema_stack_aligned;
use crate::indicators::rsi::calculate_rsi_with;
use crate::market_data::{fetch_checked, BarRequest, BarSeries, MarketDataProvider};
use crate::runtime_config::ScannerConfig;
use crate::scanner::{ScanRow, Strategy};
use crate::types::{Direction, ScanMode, Signal, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumLabel {
    #[serde(rename = "Strongly Bullish")]
    StronglyBullish,
    Pullback,
    Caution,
    #[serde(rename = "Strongly Bearish")]
    StronglyBearish,
    #[serde(rename = "Data Error")]
    DataError,
    #[serde(rename = "Calc Error")]
    CalcError,
    Error,
}

impl MomentumLabel {
    pub fn from_signals(daily: Signal, weekly: Signal) -> Self {
        match (daily.is_bullish(), weekly.is_bullish()) {
            (true, true) => Self::StronglyBullish,
            (false, true) => Self::Pullback,
            (true, false) => Self::Caution,
            (false, false) => Self::StronglyBearish,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StronglyBullish => "Strongly Bullish",
            Self::Pullback => "Pullback",
            Self::Caution => "Caution",
            Self::StronglyBearish => "Strongly Bearish",
            Self::DataError => "Data Error",
            Self::CalcError => "Calc Error",
            Self::Error => "Error",
        }
    }

    pub fn is_valid(self) -> bool {
        !matches!(self, Self::DataError | Self::CalcError | Self::Error)
    }
}

impl std::fmt::Display for MomentumLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a momentum scan.
#[derive(Debug, Clone, Serialize)]
pub struct MomentumResult {
    pub ticker: String,
    pub name: String,
    pub category: String,
    pub label: MomentumLabel,
    pub daily_rsi: Option<f64>,
    pub weekly_rsi: Option<f64>,
    pub ema_aligned: Option<bool>,
    pub score: Option<f64>,
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MomentumResult {
    pub fn failed(ticker: &TickerRecord, label: MomentumLabel, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            label,
            daily_rsi: None,
            weekly_rsi: None,
            ema_aligned: None,
            score: None,
            price: None,
            error: Some(reason.into()),
        }
    }
}

impl ScanRow for MomentumResult {
    fn is_valid(&self) -> bool {
        self.label.is_valid()
    }

    fn bias(&self) -> Option<Direction> {
        match self.label {
            MomentumLabel::StronglyBullish => Some(Direction::Long),
            MomentumLabel::StronglyBearish => Some(Direction::Short),
            _ => None,
        }
    }

    fn sort_value(&self) -> Option<f64> {
        self.score
    }
}

/// Bias score: both RSIs plus `bonus` when the EMAs are aligned.
pub fn momentum_score(daily_rsi: f64, weekly_rsi: f64, aligned: bool, bonus: f64) -> f64 {
    daily_rsi + weekly_rsi + if aligned { bonus } else { 0.0 }
}

pub struct MomentumStrategy;

impl MomentumStrategy {
    async fn fetch(
        provider: &dyn MarketDataProvider,
        ticker: &TickerRecord,
        request: &BarRequest,
    ) -> Result<BarSeries, MomentumResult> {
        match fetch_checked(provider, &ticker.symbol, request).await {
            Ok(Some(series)) => Ok(series),
            Ok(None) => Err(MomentumResult::failed(
                ticker,
                MomentumLabel::DataError,
                format!("{} history shorter than {} bars", request.timeframe, request.min_bars),
            )),
            Err(e) => {
                warn!(symbol = %ticker.symbol, error = %e, "fetch failed");
                Err(MomentumResult::failed(ticker, MomentumLabel::Error, format!("{e:#}")))
            }
        }
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    type Output = MomentumResult;

    fn mode(&self) -> ScanMode {
        ScanMode::Momentum
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &TickerRecord,
        config: &ScannerConfig,
    ) -> MomentumResult {
        let m = &config.momentum;
        let ind = &config.indicators;

        let daily_req = BarRequest::new(Timeframe::Daily, &m.daily_period, m.min_daily_bars);
        let daily = match Self::fetch(provider, ticker, &daily_req).await {
            Ok(s) => s,
            Err(row) => return row,
        };
        let weekly_req = BarRequest::new(Timeframe::Weekly, &m.weekly_period, m.min_weekly_bars);
        let weekly = match Self::fetch(provider, ticker, &weekly_req).await {
            Ok(s) => s,
            Err(row) => return row,
        };

        let daily_closes = daily.closes();
        let daily_rsi = calculate_rsi_with(&daily_closes, ind.rsi_window, ind.rsi_method)
            .last()
            .copied();
        let weekly_rsi = calculate_rsi_with(&weekly.closes(), ind.rsi_window, ind.rsi_method)
            .last()
            .copied();
        let aligned = ema_stack_aligned(&daily_closes, &m.ema_spans);

        let (Some(d_rsi), Some(w_rsi), Some(aligned)) = (daily_rsi, weekly_rsi, aligned) else {
            return MomentumResult::failed(ticker, MomentumLabel::CalcError, "RSI or EMA not computable");
        };

        let label = MomentumLabel::from_signals(
            Signal::versus(d_rsi, ind.rsi_mid),
            Signal::versus(w_rsi, ind.rsi_mid),
        );
        let score = momentum_score(d_rsi, w_rsi, aligned, m.alignment_bonus);

        debug!(symbol = %ticker.symbol, %label, score, aligned, "momentum evaluated");

        MomentumResult {
            ticker: ticker.symbol.clone(),
            name: ticker.name.clone(),
            category: ticker.category.clone(),
            label,
            daily_rsi: Some(d_rsi),
            weekly_rsi: Some(w_rsi),
            ema_aligned: Some(aligned),
            score: Some(score),
            price: daily.last_close(),
            error: None,
        }
    }
}
