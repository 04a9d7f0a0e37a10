// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3 — Smooth:
//            Wilder: avg = (prev_avg * (period - 1) + current) / period
//            Sma:    avg = mean of the last `period` gains / losses
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
// =============================================================================

use serde::{Deserialize, Serialize};

/// Averaging used for the gain/loss series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RsiMethod {
    /// Classic Wilder recursive smoothing.
    #[default]
    Wilder,
    /// Plain rolling mean of the last `period` gains and losses.
    Sma,
}

/// Compute the RSI series with the selected smoothing `method`.
pub fn calculate_rsi_with(closes: &[f64], period: usize, method: RsiMethod) -> Vec<f64> {
    match method {
        RsiMethod::Wilder => calculate_rsi(closes, period),
        RsiMethod::Sma => calculate_rsi_sma(closes, period),
    }
}

/// Compute the Wilder-smoothed RSI series for the given `closes` and `period`.
///
/// The returned vector has one RSI value for each close starting at index
/// `period` (the first `period` closes are consumed to seed the averages).
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `closes.len() < period + 1` => empty vec (need at least `period` deltas)
/// - If average loss is zero (no down moves), RSI is clamped to 100.0.
/// - Non-finite results are dropped and the series is truncated.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| split_delta(d, g, l));

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let Some(first_rsi) = rsi_from_averages(avg_gain, avg_loss) else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(first_rsi);

    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// RSI using a simple rolling mean of gains and losses instead of Wilder's
/// recursion. Output alignment matches [`calculate_rsi`].
pub fn calculate_rsi_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    for window in deltas.windows(period) {
        let (g, l) = window
            .iter()
            .fold((0.0_f64, 0.0_f64), |(g, l), &d| split_delta(d, g, l));
        match rsi_from_averages(g / period_f, l / period_f) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

// =============================================================================
// Internal helpers
// =============================================================================

fn split_delta(d: f64, gain: f64, loss: f64) -> (f64, f64) {
    if d > 0.0 {
        (gain + d, loss)
    } else {
        (gain, loss + d.abs())
    }
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [f64; 18] = [
        44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
        44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
    ];

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert!(calculate_rsi_sma(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).is_empty());
        assert!(calculate_rsi_sma(&closes, 14).is_empty());
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 16);
        for &v in &series {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for &v in &calculate_rsi(&closes, 14) {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market() {
        for &v in &calculate_rsi(&[100.0; 30], 14) {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_range_check() {
        for &v in &calculate_rsi(&SAMPLE, 14) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn sma_variant_matches_wilder_on_first_value() {
        let wilder = calculate_rsi(&SAMPLE, 14);
        let sma = calculate_rsi_sma(&SAMPLE, 14);
        assert_eq!(wilder.len(), sma.len());
        assert!((wilder[0] - sma[0]).abs() < 1e-10);
    }

    #[test]
    fn sma_variant_diverges_after_seed() {
        let wilder = calculate_rsi(&SAMPLE, 14);
        let sma = calculate_rsi_sma(&SAMPLE, 14);
        assert!((wilder[3] - sma[3]).abs() > 1e-6);
    }

    #[test]
    fn method_dispatch() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert_eq!(
            calculate_rsi_with(&closes, 14, RsiMethod::Sma),
            calculate_rsi_sma(&closes, 14)
        );
        assert_eq!(
            calculate_rsi_with(&closes, 14, RsiMethod::Wilder),
            calculate_rsi(&closes, 14)
        );
    }
}
