//! Fibonacci retracement levels of the recent range.

use super::super::stats;
use crate::types::FibonacciReading;

pub const RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];
const LOOKBACK: usize = 50;
/// Proximity tolerance as a share of the range.
const TOLERANCE: f64 = 0.02;

/// Retracements measured down from the high of the last 50 closes. The
/// nearest level is the first one price sits within 2% of the range of.
pub fn levels(closes: &[f64]) -> Option<FibonacciReading> {
    if closes.is_empty() {
        return None;
    }

    let window = stats::tail(closes, LOOKBACK);
    let high = stats::max(window);
    let low = stats::min(window);
    let range = high - low;
    let price = closes[closes.len() - 1];

    let levels: Vec<(f64, f64)> = RATIOS.iter().map(|r| (*r, high - range * r)).collect();
    let nearest = if range > 0.0 {
        levels
            .iter()
            .find(|(_, level)| (price - level).abs() <= range * TOLERANCE)
            .map(|(ratio, _)| *ratio)
    } else {
        None
    };

    Some(FibonacciReading {
        high,
        low,
        levels,
        nearest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_between_high_and_low() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let reading = levels(&closes).unwrap();
        assert_eq!(reading.high, 159.0);
        assert_eq!(reading.low, 110.0);
        assert!(reading.levels.iter().all(|(_, p)| *p < 159.0 && *p > 110.0));
        assert_eq!(reading.nearest, None);
    }

    #[test]
    fn test_price_on_golden_ratio() {
        let mut closes = vec![100.0, 200.0];
        closes.push(200.0 - 100.0 * 0.618);
        let reading = levels(&closes).unwrap();
        assert_eq!(reading.nearest, Some(0.618));
    }

    #[test]
    fn test_flat_has_no_nearest() {
        assert_eq!(levels(&[5.0; 10]).unwrap().nearest, None);
    }
}
