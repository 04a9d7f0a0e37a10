// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)
//   signal    = EMA(line, signal_span)
//   histogram = line - signal
//
// All three output series are trimmed to the same length so that index `i`
// of each refers to the same bar, and the last element is the latest close.
// =============================================================================

use serde::Serialize;

use super::ema::calculate_ema;
use crate::types::Direction;

/// Aligned MACD line, signal and histogram series.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute MACD for `closes`.
///
/// Returns an empty series when `fast >= slow`, any span is zero, or there
/// are not enough closes to produce a single signal value
/// (`slow + signal - 1` closes are needed).
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if fast == 0 || signal == 0 || fast >= slow {
        return MacdSeries::default();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    if slow_ema.is_empty() {
        return MacdSeries::default();
    }

    // fast EMA starts at index fast-1, slow at slow-1.
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .zip(fast_ema.iter().skip(offset))
        .map(|(s, f)| f - s)
        .collect();

    let signal_line = calculate_ema(&line, signal);
    if signal_line.is_empty() {
        return MacdSeries::default();
    }

    let line = line[line.len() - signal_line.len()..].to_vec();
    let histogram = line
        .iter()
        .zip(signal_line.iter())
        .map(|(l, s)| l - s)
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Most recent crossing of `fast` over `slow` within the last `lookback`
/// bars. Both slices must be aligned at their ends.
///
/// An upward cross (fast moves from at-or-below to above) is reported as
/// `Direction::Long`, a downward cross as `Direction::Short`.
pub fn last_cross(fast: &[f64], slow: &[f64], lookback: usize) -> Option<Direction> {
    let n = fast.len().min(slow.len());
    if n < 2 || lookback == 0 {
        return None;
    }

    let fast = &fast[fast.len() - n..];
    let slow = &slow[slow.len() - n..];
    let start = n.saturating_sub(lookback).max(1);

    (start..n).rev().find_map(|i| {
        let prev = fast[i - 1] - slow[i - 1];
        let cur = fast[i] - slow[i];
        if prev <= 0.0 && cur > 0.0 {
            Some(Direction::Long)
        } else if prev >= 0.0 && cur < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    })
}

/// Histogram hook: the histogram is on one side of zero and has just turned
/// back toward it.
///
/// Below zero and rising after a fall (or flat) is a bullish hook, above zero
/// and falling after a rise is a bearish hook.
pub fn hook(histogram: &[f64]) -> Option<Direction> {
    let &[h0, h1, h2] = histogram.get(histogram.len().checked_sub(3)?..)? else {
        return None;
    };

    if h2 < 0.0 && h1 < 0.0 && h2 > h1 && h1 <= h0 {
        Some(Direction::Long)
    } else if h2 > 0.0 && h1 > 0.0 && h2 < h1 && h1 >= h0 {
        Some(Direction::Short)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 10.0 * (i as f64 / 6.0).sin()).collect()
    }

    #[test]
    fn macd_needs_slow_plus_signal() {
        let closes: Vec<f64> = (1..=33).map(|x| x as f64).collect();
        assert!(calculate_macd(&closes, 12, 26, 9).histogram.is_empty());

        let closes: Vec<f64> = (1..=34).map(|x| x as f64).collect();
        assert_eq!(calculate_macd(&closes, 12, 26, 9).histogram.len(), 1);
    }

    #[test]
    fn macd_invalid_spans() {
        let closes = wave(100);
        assert!(calculate_macd(&closes, 26, 12, 9).histogram.is_empty());
        assert!(calculate_macd(&closes, 0, 26, 9).histogram.is_empty());
        assert!(calculate_macd(&closes, 12, 26, 0).histogram.is_empty());
    }

    #[test]
    fn macd_series_are_aligned() {
        let closes = wave(120);
        let macd = calculate_macd(&closes, 12, 26, 9);
        assert_eq!(macd.line.len(), macd.signal.len());
        assert_eq!(macd.line.len(), macd.histogram.len());
        assert_eq!(macd.histogram.len(), 120 - 26 - 9 + 2);
        for i in 0..macd.histogram.len() {
            assert!((macd.histogram[i] - (macd.line[i] - macd.signal[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (1..=80).map(|x| x as f64).collect();
        let macd = calculate_macd(&closes, 12, 26, 9);
        assert!(*macd.line.last().unwrap() > 0.0);
    }

    #[test]
    fn cross_detected_within_lookback() {
        let fast = [1.0, 1.0, 1.0, 3.0];
        let slow = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(last_cross(&fast, &slow, 3), Some(Direction::Long));
        assert_eq!(last_cross(&fast, &slow, 1), Some(Direction::Long));
    }

    #[test]
    fn cross_outside_lookback_is_ignored() {
        let fast = [3.0, 1.0, 1.0, 1.0, 1.0];
        let slow = [2.0, 2.0, 2.0, 2.0, 2.0];
        assert_eq!(last_cross(&fast, &slow, 5), Some(Direction::Short));
        assert_eq!(last_cross(&fast, &slow, 2), None);
    }

    #[test]
    fn most_recent_cross_wins() {
        let fast = [1.0, 3.0, 1.0];
        let slow = [2.0, 2.0, 2.0];
        assert_eq!(last_cross(&fast, &slow, 3), Some(Direction::Short));
    }

    #[test]
    fn hook_detection() {
        assert_eq!(hook(&[-1.0, -2.0, -1.5]), Some(Direction::Long));
        assert_eq!(hook(&[1.0, 2.0, 1.5]), Some(Direction::Short));
        assert_eq!(hook(&[-3.0, -2.0, -1.0]), None);
        assert_eq!(hook(&[-1.0, -2.0, 0.5]), None);
        assert_eq!(hook(&[1.0, 2.0]), None);
    }
}
