// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   multiplier = 2 / (span + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `span` closes.
// =============================================================================

/// Compute the EMA series for the given `closes` slice and look-back `span`.
///
/// Returns an empty `Vec` when the input is too short or the span is zero.
/// Each output element corresponds to a close starting at index `span - 1`.
///
/// # Edge cases
/// - `span == 0` => empty vec
/// - `closes.len() < span` => empty vec
/// - A non-finite intermediate value truncates the series.
pub fn calculate_ema(closes: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || closes.len() < span {
        return Vec::new();
    }

    let multiplier = 2.0 / (span + 1) as f64;

    let sma: f64 = closes[..span].iter().sum::<f64>() / span as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - span + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &close in &closes[span..] {
        let ema = close * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// Latest EMA value, or `None` when there is not enough data.
pub fn last_ema(closes: &[f64], span: usize) -> Option<f64> {
    calculate_ema(closes, span).last().copied()
}

/// Check whether the latest EMAs of `spans` (shortest first) are stacked in
/// strictly descending order, e.g. EMA7 > EMA11 > EMA21.
///
/// Returns `None` when any EMA cannot be computed.
pub fn ema_stack_aligned(closes: &[f64], spans: &[usize]) -> Option<bool> {
    let latest = spans
        .iter()
        .map(|&span| last_ema(closes, span))
        .collect::<Option<Vec<f64>>>()?;

    Some(latest.windows(2).all(|w| w[0] > w[1]))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_span_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_insufficient_data() {
        assert!(calculate_ema(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn ema_span_equals_length_is_sma() {
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3);
        assert_eq!(ema.len(), 1);
        assert!((ema[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), 6);

        let mult = 2.0 / 6.0;
        let mut expected = 3.0;
        let mut expected_vec = vec![expected];
        for &c in &closes[5..] {
            expected = c * mult + expected * (1.0 - mult);
            expected_vec.push(expected);
        }
        for (a, b) in ema.iter().zip(expected_vec.iter()) {
            assert!((a - b).abs() < 1e-10, "got {a}, expected {b}");
        }
    }

    #[test]
    fn ema_stops_on_nan() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 3);
        assert_eq!(ema.len(), 1);
    }

    #[test]
    fn stack_aligned_on_rising_series() {
        assert_eq!(ema_stack_aligned(&ascending(60), &[7, 11, 21]), Some(true));
    }

    #[test]
    fn stack_not_aligned_on_falling_series() {
        let closes: Vec<f64> = (1..=60).rev().map(|x| x as f64).collect();
        assert_eq!(ema_stack_aligned(&closes, &[7, 11, 21]), Some(false));
    }

    #[test]
    fn stack_flat_is_not_aligned() {
        assert_eq!(ema_stack_aligned(&[100.0; 60], &[7, 11, 21]), Some(false));
    }

    #[test]
    fn stack_needs_longest_span() {
        assert_eq!(ema_stack_aligned(&ascending(20), &[7, 11, 21]), None);
    }
}
