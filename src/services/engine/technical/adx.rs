//! Simplified ADX from close-to-close directional movement.

use super::super::stats;
use crate::types::AdxReading;

/// Trend strength above this is strong.
pub const STRONG_TREND: f64 = 25.0;

/// ADX over closes.
///
/// +DM and -DM are the up and down moves of each bar; the true range is the
/// absolute move. Over the last `period` bars, +DI and -DI are each side's
/// share of the total range and ADX is the DX of those two lines.
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Adx {
    pub fn calculate(&self, closes: &[f64]) -> Option<AdxReading> {
        if self.period == 0 || closes.len() < self.period + 1 {
            return None;
        }

        let (plus_dm, minus_dm) = stats::pressure(stats::tail(closes, self.period + 1));
        let true_range = plus_dm + minus_dm;

        let (plus_di, minus_di) = if true_range > 0.0 {
            (plus_dm / true_range * 100.0, minus_dm / true_range * 100.0)
        } else {
            (0.0, 0.0)
        };

        let di_sum = plus_di + minus_di;
        let adx = if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        };

        Some(AdxReading {
            adx,
            plus_di,
            minus_di,
            strong: adx > STRONG_TREND,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bias;

    #[test]
    fn test_adx_uptrend_is_strong_bullish() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 1.5).collect();
        let reading = Adx::default().calculate(&closes).unwrap();
        assert_eq!(reading.adx, 100.0);
        assert!(reading.strong);
        assert_eq!(reading.directional_bias(), Bias::Bullish);
    }

    #[test]
    fn test_adx_choppy_is_weak() {
        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let reading = Adx::default().calculate(&closes).unwrap();
        assert!(!reading.strong);
        assert_eq!(reading.directional_bias(), Bias::Neutral);
    }

    #[test]
    fn test_adx_flat_is_zero() {
        let reading = Adx::default().calculate(&[3.0; 20]).unwrap();
        assert_eq!(reading.adx, 0.0);
    }
}
