// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Every strategy constant (timeframe periods, indicator spans, thresholds,
// cache TTL, history location) lives here so a scan can be re-tuned by
// editing one JSON file.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::rsi::RsiMethod;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_period_conditions() -> String {
    "5y".to_string()
}

fn default_period_entry() -> String {
    "1y".to_string()
}

fn default_period_context() -> String {
    "10y".to_string()
}

fn default_true() -> bool {
    true
}

fn default_ema_short() -> usize {
    11
}

fn default_ema_long() -> usize {
    21
}

fn default_ema_context() -> usize {
    50
}

fn default_rsi_window() -> usize {
    14
}

fn default_rsi_mid() -> f64 {
    50.0
}

fn default_rsi_ma_period() -> usize {
    9
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_min_entry_rules() -> usize {
    2
}

fn default_cross_lookback() -> usize {
    3
}

fn default_bounce_tolerance_pct() -> f64 {
    0.5
}

fn default_monthly_long_floor() -> f64 {
    40.0
}

fn default_monthly_short_ceiling() -> f64 {
    60.0
}

fn default_mcso_window() -> usize {
    20
}

fn default_mcso_threshold() -> f64 {
    50.0
}

fn default_cache_ttl_secs() -> u64 {
    1800
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("score_history")
}

fn default_provider_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_chart_bars() -> usize {
    120
}

fn default_momentum_daily_period() -> String {
    "3mo".to_string()
}

fn default_momentum_weekly_period() -> String {
    "1y".to_string()
}

fn default_momentum_ema_spans() -> Vec<usize> {
    vec![7, 11, 21]
}

fn default_momentum_min_daily_bars() -> usize {
    30
}

fn default_momentum_min_weekly_bars() -> usize {
    14
}

fn default_alignment_bonus() -> f64 {
    50.0
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Indicator spans and thresholds shared by every timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_ema_short")]
    pub ema_short: usize,

    #[serde(default = "default_ema_long")]
    pub ema_long: usize,

    /// Longer weekly context EMA, informational only.
    #[serde(default = "default_ema_context")]
    pub ema_context: usize,

    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    /// RSI midline separating bullish from bearish momentum.
    #[serde(default = "default_rsi_mid")]
    pub rsi_mid: f64,

    /// Period of the simple moving average drawn over the RSI.
    #[serde(default = "default_rsi_ma_period")]
    pub rsi_ma_period: usize,

    #[serde(default)]
    pub rsi_method: RsiMethod,

    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    /// Number of trailing bars searched for MACD/RSI crosses and EMA bounces.
    #[serde(default = "default_cross_lookback")]
    pub cross_lookback: usize,

    /// How close (percent of the EMA) a low must come to count as a touch.
    #[serde(default = "default_bounce_tolerance_pct")]
    pub bounce_tolerance_pct: f64,

    /// Trailing bars kept on each snapshot for charting.
    #[serde(default = "default_chart_bars")]
    pub chart_bars: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_short: default_ema_short(),
            ema_long: default_ema_long(),
            ema_context: default_ema_context(),
            rsi_window: default_rsi_window(),
            rsi_mid: default_rsi_mid(),
            rsi_ma_period: default_rsi_ma_period(),
            rsi_method: RsiMethod::default(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            cross_lookback: default_cross_lookback(),
            bounce_tolerance_pct: default_bounce_tolerance_pct(),
            chart_bars: default_chart_bars(),
        }
    }
}

impl IndicatorParams {
    /// Minimum number of bars a conditions/entry series must carry before it
    /// is scored at all.
    pub fn min_bars(&self) -> usize {
        self.ema_long.max(self.macd_slow) + 5
    }
}

// =============================================================================
// SetupRules
// =============================================================================

/// Thresholds of the weekly/daily/monthly setup evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupRules {
    /// Daily entry rules that must hold to promote Watch to Potential.
    #[serde(default = "default_min_entry_rules")]
    pub min_entry_rules: usize,

    /// Whether the monthly timeframe is fetched and checked at all.
    #[serde(default = "default_true")]
    pub use_monthly_context: bool,

    /// A Potential Long is cautioned when monthly RSI is below this.
    #[serde(default = "default_monthly_long_floor")]
    pub monthly_long_floor: f64,

    /// A Potential Short is cautioned when monthly RSI is above this.
    #[serde(default = "default_monthly_short_ceiling")]
    pub monthly_short_ceiling: f64,
}

impl Default for SetupRules {
    fn default() -> Self {
        Self {
            min_entry_rules: default_min_entry_rules(),
            use_monthly_context: true,
            monthly_long_floor: default_monthly_long_floor(),
            monthly_short_ceiling: default_monthly_short_ceiling(),
        }
    }
}

// =============================================================================
// MomentumParams
// =============================================================================

/// Settings of the daily/weekly RSI bias scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumParams {
    #[serde(default = "default_momentum_daily_period")]
    pub daily_period: String,

    #[serde(default = "default_momentum_weekly_period")]
    pub weekly_period: String,

    /// Daily EMA spans that must be stacked shortest-first for alignment.
    #[serde(default = "default_momentum_ema_spans")]
    pub ema_spans: Vec<usize>,

    #[serde(default = "default_momentum_min_daily_bars")]
    pub min_daily_bars: usize,

    #[serde(default = "default_momentum_min_weekly_bars")]
    pub min_weekly_bars: usize,

    /// Added to the score when the daily EMAs are aligned.
    #[serde(default = "default_alignment_bonus")]
    pub alignment_bonus: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            daily_period: default_momentum_daily_period(),
            weekly_period: default_momentum_weekly_period(),
            ema_spans: default_momentum_ema_spans(),
            min_daily_bars: default_momentum_min_daily_bars(),
            min_weekly_bars: default_momentum_min_weekly_bars(),
            alignment_bonus: default_alignment_bonus(),
        }
    }
}

// =============================================================================
// ScannerConfig
// =============================================================================

/// Top-level configuration for the scanner.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    // --- Data periods -------------------------------------------------------

    /// History requested for the weekly conditions timeframe.
    #[serde(default = "default_period_conditions")]
    pub period_conditions: String,

    /// History requested for the daily entry timeframe.
    #[serde(default = "default_period_entry")]
    pub period_entry: String,

    /// History requested for the monthly context timeframe.
    #[serde(default = "default_period_context")]
    pub period_context: String,

    // --- Strategy -----------------------------------------------------------

    #[serde(default)]
    pub indicators: IndicatorParams,

    #[serde(default)]
    pub rules: SetupRules,

    #[serde(default)]
    pub momentum: MomentumParams,

    // --- MCSO ---------------------------------------------------------------

    #[serde(default = "default_mcso_window")]
    pub mcso_window: usize,

    /// MCSO at or above this is reported BULLISH.
    #[serde(default = "default_mcso_threshold")]
    pub mcso_threshold: f64,

    // --- Scan loop ----------------------------------------------------------

    /// Upper bound on tickers per scan; 0 disables the cap.
    #[serde(default)]
    pub max_tickers: usize,

    // --- Infrastructure -----------------------------------------------------

    /// Seconds a fetched bar series stays cached.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,

    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            period_conditions: default_period_conditions(),
            period_entry: default_period_entry(),
            period_context: default_period_context(),
            indicators: IndicatorParams::default(),
            rules: SetupRules::default(),
            momentum: MomentumParams::default(),
            mcso_window: default_mcso_window(),
            mcso_threshold: default_mcso_threshold(),
            max_tickers: 0,
            cache_ttl_secs: default_cache_ttl_secs(),
            history_dir: default_history_dir(),
            provider_url: default_provider_url(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;

        info!(
            path = %path.display(),
            min_entry_rules = config.rules.min_entry_rules,
            rsi_method = ?config.indicators.rsi_method,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise scanner config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "scanner config saved (atomic)");
        Ok(())
    }

    /// Apply `SCANNER_*` environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("SCANNER_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var("SCANNER_HISTORY_DIR") {
            if !dir.trim().is_empty() {
                self.history_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(url) = std::env::var("SCANNER_PROVIDER_URL") {
            if !url.trim().is_empty() {
                self.provider_url = url.trim().trim_end_matches('/').to_string();
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.period_conditions, "5y");
        assert_eq!(cfg.period_entry, "1y");
        assert_eq!(cfg.indicators.ema_short, 11);
        assert_eq!(cfg.indicators.ema_long, 21);
        assert_eq!(cfg.indicators.rsi_window, 14);
        assert_eq!(cfg.indicators.macd_slow, 26);
        assert_eq!(cfg.indicators.cross_lookback, 3);
        assert_eq!(cfg.indicators.rsi_method, RsiMethod::Wilder);
        assert_eq!(cfg.rules.min_entry_rules, 2);
        assert!(cfg.rules.use_monthly_context);
        assert_eq!(cfg.cache_ttl_secs, 1800);
        assert_eq!(cfg.max_tickers, 0);
        assert_eq!(cfg.momentum.ema_spans, vec![7, 11, 21]);
        assert_eq!(cfg.momentum.min_daily_bars, 30);
        assert!((cfg.mcso_threshold - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn min_bars_covers_longest_indicator() {
        let params = IndicatorParams::default();
        assert_eq!(params.min_bars(), 31);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ScannerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.indicators.rsi_ma_period, 9);
        assert_eq!(cfg.history_dir, PathBuf::from("score_history"));
        assert!((cfg.rules.monthly_long_floor - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "rules": { "min_entry_rules": 3 }, "indicators": { "rsi_method": "sma" } }"#;
        let cfg: ScannerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.rules.min_entry_rules, 3);
        assert!(cfg.rules.use_monthly_context);
        assert_eq!(cfg.indicators.rsi_method, RsiMethod::Sma);
        assert_eq!(cfg.indicators.ema_long, 21);
    }

    #[test]
    fn save_then_load_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner_config.json");

        let mut cfg = ScannerConfig::default();
        cfg.max_tickers = 40;
        cfg.save(&path).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let loaded = ScannerConfig::load(&path).unwrap();
        assert_eq!(loaded.max_tickers, 40);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ScannerConfig::load(dir.path().join("nope.json")).is_err());
    }
}
