//! Normalized volatility scalar.

use super::stats;

/// Scale applied to the standard deviation of simple returns. Uncalibrated
/// display constant; tune freely.
pub const VOLATILITY_SCALE: f64 = 1200.0;

/// Population standard deviation of simple returns, scaled by
/// [`VOLATILITY_SCALE`]. Zero for fewer than two prices.
pub fn calculate(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    stats::std_dev(&stats::returns(history)) * VOLATILITY_SCALE
}

/// Volatility of the last `n` prices.
pub fn trailing(history: &[f64], n: usize) -> f64 {
    calculate(stats::tail(history, n))
}

/// Volatility of the `window` prices that precede the last `recent` ones.
///
/// Ratio checks compare a short window against this baseline. A baseline that
/// contained the short window could never exceed it by more than
/// `sqrt((window - 1) / (recent - 1))`.
pub fn preceding(history: &[f64], recent: usize, window: usize) -> f64 {
    let end = history.len().saturating_sub(recent);
    calculate(stats::tail(&history[..end], window))
}
