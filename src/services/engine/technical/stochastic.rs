//! Stochastic oscillator over closing prices.

use super::super::stats;
use crate::types::{StochasticCross, StochasticReading};

/// Stochastic Oscillator.
///
/// %K = (Close - Lowest) / (Highest - Lowest) * 100 over `k_period` closes;
/// %D = SMA of %K over `d_period`. A flat window reads 50.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

impl Stochastic {
    /// Needs one extra %D value for cross detection.
    pub fn min_periods(&self) -> usize {
        self.k_period + self.d_period
    }

    fn k_series(&self, closes: &[f64]) -> Vec<f64> {
        closes
            .windows(self.k_period)
            .map(|window| {
                let high = stats::max(window);
                let low = stats::min(window);
                let close = window[window.len() - 1];
                if high == low {
                    50.0
                } else {
                    (close - low) / (high - low) * 100.0
                }
            })
            .collect()
    }

    pub fn calculate(&self, closes: &[f64]) -> Option<StochasticReading> {
        if self.k_period == 0 || self.d_period == 0 || closes.len() < self.min_periods() {
            return None;
        }

        let k_values = self.k_series(closes);
        let d_values: Vec<f64> = k_values.windows(self.d_period).map(stats::mean).collect();

        let (k, previous_k) = match k_values.as_slice() {
            [.., previous, last] => (*last, *previous),
            _ => return None,
        };
        let (d, previous_d) = match d_values.as_slice() {
            [.., previous, last] => (*last, *previous),
            _ => return None,
        };

        let cross = if previous_k <= previous_d && k > d {
            StochasticCross::Bullish
        } else if previous_k >= previous_d && k < d {
            StochasticCross::Bearish
        } else {
            StochasticCross::None
        };

        Some(StochasticReading { k, d, cross })
    }
}
