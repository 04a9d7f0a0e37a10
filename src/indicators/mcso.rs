// =============================================================================
// Monthly Cycle Swing Oscillator (MCSO)
// =============================================================================
//
//   MCSO = (close - low_N) / (high_N - low_N) * 100
//
// where high_N / low_N are the highest high and lowest low of the last N bars
// (N = 20, roughly one trading month).
// =============================================================================

use serde::Serialize;

/// Range below which the oscillator is reported as zero.
const DEGENERATE_RANGE: f64 = 1e-6;

/// MCSO value with the inputs it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct McsoReading {
    pub mcso: f64,
    pub close: f64,
    pub range_low: f64,
    pub range_high: f64,
}

/// Compute the MCSO over the trailing `window` bars.
///
/// Slices must be equally long. When fewer than `window` bars exist the whole
/// slice is used. Returns `None` for empty input, `window == 0` or any
/// non-finite value in the window.
pub fn calculate_mcso(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    window: usize,
) -> Option<McsoReading> {
    let n = closes.len();
    if n == 0 || window == 0 || highs.len() != n || lows.len() != n {
        return None;
    }

    let start = n.saturating_sub(window);
    if highs[start..]
        .iter()
        .chain(&lows[start..])
        .chain(&closes[start..])
        .any(|v| !v.is_finite())
    {
        return None;
    }

    let range_high = highs[start..].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range_low = lows[start..].iter().copied().fold(f64::INFINITY, f64::min);
    let close = closes[n - 1];

    let range = range_high - range_low;
    let mcso = if range.abs() < DEGENERATE_RANGE {
        0.0
    } else {
        (close - range_low) / range * 100.0
    };

    Some(McsoReading {
        mcso,
        close,
        range_low,
        range_high,
    })
}
