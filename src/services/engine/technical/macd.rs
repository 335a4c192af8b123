//! MACD (Moving Average Convergence Divergence).

use crate::types::{Bias, MacdReading};

/// MACD indicator.
///
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// EMA series seeded with the SMA of the first `period` values. The first
/// element lines up with `values[period - 1]`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len() - period + 1);
    let mut current = values.iter().take(period).sum::<f64>() / period as f64;
    series.push(current);

    for value in &values[period..] {
        current = (value - current) * multiplier + current;
        series.push(current);
    }

    series
}

impl Macd {
    pub fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period
    }

    pub fn calculate(&self, closes: &[f64]) -> Option<MacdReading> {
        if closes.len() < self.min_periods() {
            return None;
        }

        let fast = ema(closes, self.fast_period);
        let slow = ema(closes, self.slow_period);

        // Align fast EMA to slow EMA start
        let offset = self.slow_period - self.fast_period;
        let line: Vec<f64> = slow
            .iter()
            .zip(fast.iter().skip(offset))
            .map(|(s, f)| f - s)
            .collect();

        let signal_line = ema(&line, self.signal_period);
        let macd = *line.last()?;
        let signal = *signal_line.last()?;
        let histogram = macd - signal;

        let trend = if histogram > 0.0 {
            Bias::Bullish
        } else if histogram < 0.0 {
            Bias::Bearish
        } else {
            Bias::Neutral
        };

        Some(MacdReading {
            macd,
            signal,
            histogram,
            trend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_seeded_with_sma() {
        let series = ema(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(series.len(), 2);
        assert!((series[0] - 2.0).abs() < 1e-12);
        assert!((series[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_macd_insufficient_data() {
        assert!(Macd::default().calculate(&[1.0; 34]).is_none());
    }

    #[test]
    fn test_macd_accelerating_uptrend_is_bullish() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let reading = Macd::default().calculate(&closes).unwrap();
        assert!(reading.macd > 0.0);
        assert_eq!(reading.trend, Bias::Bullish);
    }

    #[test]
    fn test_macd_flat_is_neutral() {
        let reading = Macd::default().calculate(&[50.0; 100]).unwrap();
        assert_eq!(reading.trend, Bias::Neutral);
        assert_eq!(reading.histogram, 0.0);
    }
}
