// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

/// Rolling arithmetic mean over `period` values.
///
/// Output element `i` corresponds to input index `i + period - 1`. Returns an
/// empty `Vec` for `period == 0` or when there are fewer than `period` values.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let period_f = period as f64;
    let mut sum: f64 = values[..period].iter().sum();
    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sum / period_f);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result.push(sum / period_f);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_short_input() {
        assert!(calculate_sma(&[1.0, 2.0], 3).is_empty());
        assert!(calculate_sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn sma_known_values() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(sma.len(), 3);
        assert!((sma[0] - 2.0).abs() < 1e-10);
        assert!((sma[1] - 3.0).abs() < 1e-10);
        assert!((sma[2] - 4.0).abs() < 1e-10);
    }
}
