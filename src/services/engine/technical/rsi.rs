//! Relative Strength Index over closing prices.

/// Wilder-smoothed RSI.
///
/// Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    /// RSI of `closes`, `None` when fewer than `period + 1` prices.
    pub fn calculate(&self, closes: &[f64]) -> Option<f64> {
        let period = self.period;
        if period == 0 || closes.len() < period + 1 {
            return None;
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = closes
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                if change > 0.0 {
                    (change, 0.0)
                } else {
                    (0.0, -change)
                }
            })
            .unzip();

        let mut avg_gain = gains.iter().take(period).sum::<f64>() / period as f64;
        let mut avg_loss = losses.iter().take(period).sum::<f64>() / period as f64;

        for i in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        }

        if avg_loss == 0.0 {
            return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(Rsi::default().calculate(&[1.0; 14]).is_none());
    }

    #[test]
    fn test_rsi_uptrend_saturates() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(Rsi::default().calculate(&closes), Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        assert_eq!(Rsi::default().calculate(&[5.0; 30]), Some(50.0));
    }

    #[test]
    fn test_rsi_range() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let rsi = Rsi::default().calculate(&closes).unwrap();
        assert!((0.0..=100.0).contains(&rsi));
    }
}
