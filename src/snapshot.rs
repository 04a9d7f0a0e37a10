// =============================================================================
// Indicator Snapshot — latest indicator state for one timeframe
// =============================================================================
//
// Built once per (symbol, timeframe) from a checked bar series. Holds:
//   * the latest raw values (close, EMAs, RSI + its MA, MACD line/signal/hist)
//   * tagged signals comparing each value to its reference level
//   * recent events inside the cross lookback (MACD cross, RSI midline cross,
//     MACD histogram hook, EMA-long bounce)
//   * short trailing series for charting
//
// `compute` returns `None` when any required indicator cannot be produced;
// the scanner reports that as a calculation error.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::indicators::ema::calculate_ema;
use crate::indicators::macd::{calculate_macd, hook, last_cross};
use crate::indicators::rsi::calculate_rsi_with;
use crate::indicators::sma::calculate_sma;
use crate::market_data::BarSeries;
use crate::runtime_config::IndicatorParams;
use crate::types::{Direction, Signal, Timeframe};

/// Trailing series for one chart, aligned on `timestamps`. Indicator values
/// that do not exist yet at a timestamp are `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub close: Vec<Option<f64>>,
    pub ema_short: Vec<Option<f64>>,
    pub ema_long: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub rsi_ma: Vec<Option<f64>>,
    pub macd_line: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub macd_hist: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSnapshot {
    pub timeframe: Timeframe,
    pub bars: usize,
    pub as_of: DateTime<Utc>,

    // --- Parameters the values were computed with -------------------------
    pub ema_short_span: usize,
    pub ema_long_span: usize,
    pub rsi_window: usize,

    // --- Latest values ----------------------------------------------------
    pub close: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    /// Longer context EMA; `None` when the history is too short for it.
    pub ema_context: Option<f64>,
    pub rsi: f64,
    pub rsi_ma: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,

    // --- Signals ----------------------------------------------------------
    /// RSI versus its midline.
    pub rsi_state: Signal,
    pub rsi_vs_ma: Signal,
    /// MACD line versus its signal line.
    pub macd_state: Signal,
    /// MACD line versus zero.
    pub macd_zero: Signal,
    pub price_vs_ema_short: Signal,
    pub price_vs_ema_long: Signal,

    // --- Events within the cross lookback ----------------------------------
    pub macd_cross: Option<Direction>,
    pub rsi_cross: Option<Direction>,
    pub macd_hook: Option<Direction>,
    pub ema_bounce: Option<Direction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSeries>,
}

impl IndicatorSnapshot {
    /// Compute every indicator over `series`.
    pub fn compute(
        series: &BarSeries,
        timeframe: Timeframe,
        params: &IndicatorParams,
    ) -> Option<Self> {
        let closes = series.closes();
        let last_bar = series.bars.last()?;

        let ema_short_series = calculate_ema(&closes, params.ema_short);
        let ema_long_series = calculate_ema(&closes, params.ema_long);
        let rsi_series = calculate_rsi_with(&closes, params.rsi_window, params.rsi_method);
        let rsi_ma_series = calculate_sma(&rsi_series, params.rsi_ma_period);
        let macd = calculate_macd(
            &closes,
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        );

        let (Some(&ema_short), Some(&ema_long), Some(&rsi), Some(&rsi_ma)) = (
            ema_short_series.last(),
            ema_long_series.last(),
            rsi_series.last(),
            rsi_ma_series.last(),
        ) else {
            debug!(symbol = %series.symbol, %timeframe, bars = closes.len(), "EMA/RSI not computable");
            return None;
        };

        let (Some(&macd_line), Some(&macd_signal), Some(&macd_hist)) =
            (macd.line.last(), macd.signal.last(), macd.histogram.last())
        else {
            debug!(symbol = %series.symbol, %timeframe, bars = closes.len(), "MACD not computable");
            return None;
        };

        let close = last_bar.close;
        let lookback = params.cross_lookback;
        let midline = vec![params.rsi_mid; rsi_series.len()];

        let ema_bounce = detect_bounce(
            series,
            &ema_long_series,
            lookback,
            params.bounce_tolerance_pct,
        );

        let chart = (params.chart_bars > 0).then(|| {
            let n = closes.len();
            let window = params.chart_bars.min(n);
            let closes_opt = tail_aligned(&closes, n, window);
            ChartSeries {
                timestamps: series.bars[n - window..].iter().map(|b| b.timestamp).collect(),
                close: closes_opt,
                ema_short: tail_aligned(&ema_short_series, n, window),
                ema_long: tail_aligned(&ema_long_series, n, window),
                rsi: tail_aligned(&rsi_series, n, window),
                rsi_ma: tail_aligned(&rsi_ma_series, n, window),
                macd_line: tail_aligned(&macd.line, n, window),
                macd_signal: tail_aligned(&macd.signal, n, window),
                macd_hist: tail_aligned(&macd.histogram, n, window),
            }
        });

        Some(Self {
            timeframe,
            bars: closes.len(),
            as_of: last_bar.timestamp,
            ema_short_span: params.ema_short,
            ema_long_span: params.ema_long,
            rsi_window: params.rsi_window,
            close,
            ema_short,
            ema_long,
            ema_context: calculate_ema(&closes, params.ema_context).last().copied(),
            rsi,
            rsi_ma,
            macd_line,
            macd_signal,
            macd_hist,
            rsi_state: Signal::versus(rsi, params.rsi_mid),
            rsi_vs_ma: Signal::versus(rsi, rsi_ma),
            macd_state: Signal::versus(macd_line, macd_signal),
            macd_zero: Signal::versus(macd_line, 0.0),
            price_vs_ema_short: Signal::versus(close, ema_short),
            price_vs_ema_long: Signal::versus(close, ema_long),
            macd_cross: last_cross(&macd.line, &macd.signal, lookback),
            rsi_cross: last_cross(&rsi_series, &midline, lookback),
            macd_hook: hook(&macd.histogram),
            ema_bounce,
            chart,
        })
    }

    /// Copy without the chart series, for list views.
    pub fn without_chart(&self) -> Self {
        Self {
            chart: None,
            ..self.clone()
        }
    }

    /// Flat name → value mapping of the snapshot.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        let dir = |d: Option<Direction>| d.map(|d| d.to_string());

        map.insert("Close".into(), json!(self.close));
        map.insert(format!("EMA_{}", self.ema_short_span), json!(self.ema_short));
        map.insert(format!("EMA_{}", self.ema_long_span), json!(self.ema_long));
        map.insert("EMA_Context".into(), json!(self.ema_context));
        map.insert(format!("RSI_{}", self.rsi_window), json!(self.rsi));
        map.insert("RSI_MA".into(), json!(self.rsi_ma));
        map.insert("MACD_Line".into(), json!(self.macd_line));
        map.insert("MACD_Signal".into(), json!(self.macd_signal));
        map.insert("MACD_Hist".into(), json!(self.macd_hist));

        map.insert("RSI_Bullish".into(), json!(self.rsi_state.is_bullish()));
        map.insert("RSI_Bearish".into(), json!(self.rsi_state.is_bearish()));
        map.insert("RSI_Above_MA".into(), json!(self.rsi_vs_ma.is_bullish()));
        map.insert("MACD_Bullish".into(), json!(self.macd_state.is_bullish()));
        map.insert("MACD_Bearish".into(), json!(self.macd_state.is_bearish()));
        map.insert("MACD_Above_Zero".into(), json!(self.macd_zero.is_bullish()));
        map.insert(
            "Price_Above_EMA_Short".into(),
            json!(self.price_vs_ema_short.is_bullish()),
        );
        map.insert(
            "Price_Above_EMA_Long".into(),
            json!(self.price_vs_ema_long.is_bullish()),
        );

        map.insert("MACD_Cross".into(), json!(dir(self.macd_cross)));
        map.insert("RSI_Cross".into(), json!(dir(self.rsi_cross)));
        map.insert("MACD_Hook".into(), json!(dir(self.macd_hook)));
        map.insert("EMA_Bounce".into(), json!(dir(self.ema_bounce)));

        map
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Align an indicator series (which ends on the last bar) to the last
/// `window` of `total` bars, padding missing leading values with `None`.
fn tail_aligned(values: &[f64], total: usize, window: usize) -> Vec<Option<f64>> {
    let offset = total - values.len().min(total);
    (total - window..total)
        .map(|i| i.checked_sub(offset).and_then(|j| values.get(j).copied()))
        .collect()
}

/// Price pulled back to the long EMA within `lookback` bars and closed back
/// on the trend side.
///
/// Long: close above the EMA and some recent low within `tolerance_pct` of
/// (or below) it. Short mirrors with highs.
fn detect_bounce(
    series: &BarSeries,
    ema_long: &[f64],
    lookback: usize,
    tolerance_pct: f64,
) -> Option<Direction> {
    let n = series.bars.len();
    let &latest_ema = ema_long.last()?;
    let close = series.bars.last()?.close;
    if lookback == 0 || ema_long.len() > n {
        return None;
    }

    let offset = n - ema_long.len();
    let tol = tolerance_pct / 100.0;
    let start = n.saturating_sub(lookback).max(offset);
    let mut recent = (start..n).map(|i| (&series.bars[i], ema_long[i - offset]));

    if close > latest_ema {
        recent
            .any(|(bar, ema)| bar.low <= ema * (1.0 + tol))
            .then_some(Direction::Long)
    } else if close < latest_ema {
        recent
            .any(|(bar, ema)| bar.high >= ema * (1.0 - tol))
            .then_some(Direction::Short)
    } else {
        None
    }
}


#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Signal on the `direction` side of its reference.
    pub fn side(direction: Direction, value: f64) -> Signal {
        match direction {
            Direction::Long => Signal::Bullish(value),
            Direction::Short => Signal::Bearish(value),
        }
    }

    /// Snapshot with every signal neutral and no events, for rule tests.
    pub fn neutral(timeframe: Timeframe) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timeframe,
            bars: 200,
            as_of: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            ema_short_span: 11,
            ema_long_span: 21,
            rsi_window: 14,
            close: 100.0,
            ema_short: 100.0,
            ema_long: 100.0,
            ema_context: None,
            rsi: 50.0,
            rsi_ma: 50.0,
            macd_line: 0.0,
            macd_signal: 0.0,
            macd_hist: 0.0,
            rsi_state: Signal::Neutral(50.0),
            rsi_vs_ma: Signal::Neutral(50.0),
            macd_state: Signal::Neutral(0.0),
            macd_zero: Signal::Neutral(0.0),
            price_vs_ema_short: Signal::Neutral(100.0),
            price_vs_ema_long: Signal::Neutral(100.0),
            macd_cross: None,
            rsi_cross: None,
            macd_hook: None,
            ema_bounce: None,
            chart: None,
        }
    }

    /// Weekly snapshot satisfying every MUST and PREFER for `direction`.
    pub fn weekly_qualified(direction: Direction, rsi: f64) -> IndicatorSnapshot {
        let mut s = neutral(Timeframe::Weekly);
        let close = match direction {
            Direction::Long => 110.0,
            Direction::Short => 90.0,
        };
        let side = |v: f64| side(direction, v);
        s.rsi = rsi;
        s.close = close;
        s.rsi_state = side(rsi);
        s.rsi_vs_ma = side(rsi);
        s.macd_state = side(1.0);
        s.macd_zero = side(1.0);
        s.price_vs_ema_short = side(close);
        s.price_vs_ema_long = side(close);
        s
    }

    /// Daily snapshot where the first `count` ENTRY rules hold for `direction`.
    pub fn daily_with_entries(direction: Direction, count: usize) -> IndicatorSnapshot {
        let mut s = neutral(Timeframe::Daily);
        let side = |v: f64| side(direction, v);
        if count >= 1 {
            s.rsi_state = side(55.0);
            s.rsi_vs_ma = side(55.0);
            s.rsi_cross = Some(direction);
        }
        if count >= 2 {
            s.macd_cross = Some(direction);
        }
        if count >= 3 {
            s.price_vs_ema_short = side(101.0);
            s.price_vs_ema_long = side(101.0);
        }
        s
    }
}
