//! Average True Range from close-to-close moves.

use super::super::stats;
use crate::types::{AtrReading, VolatilityState};

/// ATR over closes only: the true range of a bar is `|close - previous close|`.
///
/// The current ATR is compared with the ATR of the `period` bars before it:
/// above 1.2x is expanding, below 0.8x contracting.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn min_periods(&self) -> usize {
        self.period * 2 + 1
    }

    pub fn calculate(&self, closes: &[f64]) -> Option<AtrReading> {
        if self.period == 0 || closes.len() < self.min_periods() {
            return None;
        }

        let ranges: Vec<f64> = stats::deltas(closes).iter().map(|d| d.abs()).collect();
        let n = ranges.len();
        let atr = stats::mean(&ranges[n - self.period..]);
        let previous = stats::mean(&ranges[n - 2 * self.period..n - self.period]);

        let state = if atr > previous * 1.2 {
            VolatilityState::Expanding
        } else if atr < previous * 0.8 {
            VolatilityState::Contracting
        } else {
            VolatilityState::Stable
        };

        Some(AtrReading {
            atr,
            previous,
            state,
        })
    }
}
