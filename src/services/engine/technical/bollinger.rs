//! Bollinger Bands with squeeze detection.

use super::super::stats;
use crate::types::BollingerReading;

/// Bars of band-width history averaged for the squeeze baseline.
const SQUEEZE_LOOKBACK: usize = 80;
/// Current width below this share of the baseline is a squeeze.
const SQUEEZE_RATIO: f64 = 0.7;

/// Bollinger Bands indicator.
///
/// - Middle Band = SMA(20)
/// - Upper/Lower Band = Middle ± 2 standard deviations
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// `(upper, middle, lower)` over the last `period` closes.
    pub fn bands(&self, closes: &[f64]) -> Option<(f64, f64, f64)> {
        if self.period == 0 || closes.len() < self.period {
            return None;
        }
        let window = stats::tail(closes, self.period);
        let middle = stats::mean(window);
        let spread = stats::std_dev(window) * self.std_dev_multiplier;
        Some((middle + spread, middle, middle - spread))
    }

    /// Band width relative to the middle band.
    fn width(&self, closes: &[f64]) -> Option<f64> {
        let (upper, middle, lower) = self.bands(closes)?;
        Some(if middle != 0.0 {
            (upper - lower) / middle
        } else {
            0.0
        })
    }

    pub fn calculate(&self, closes: &[f64]) -> Option<BollingerReading> {
        let (upper, middle, lower) = self.bands(closes)?;
        let width = self.width(closes)?;
        let current = closes[closes.len() - 1];

        let band_width = upper - lower;
        let percent_b = if band_width > 0.0 {
            (current - lower) / band_width
        } else {
            0.5
        };

        let n = closes.len();
        let first = n.saturating_sub(SQUEEZE_LOOKBACK).max(self.period);
        let widths: Vec<f64> = (first..=n).filter_map(|end| self.width(&closes[..end])).collect();
        let average = stats::mean(&widths);
        let squeeze = average > 0.0 && width < average * SQUEEZE_RATIO;

        Some(BollingerReading {
            upper,
            middle,
            lower,
            width,
            percent_b,
            squeeze,
        })
    }
}
