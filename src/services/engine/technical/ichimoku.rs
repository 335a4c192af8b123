//! Ichimoku cloud from closing prices.

use super::super::stats;
use crate::types::{Bias, CloudPosition, IchimokuReading};

/// Ichimoku Kinko Hyo.
///
/// Each line is the midpoint of the high and low close over its window:
/// conversion (9), base (26) and leading span B (52). Span A is the
/// midpoint of conversion and base.
pub struct Ichimoku {
    conversion_period: usize,
    base_period: usize,
    span_b_period: usize,
}

impl Default for Ichimoku {
    fn default() -> Self {
        Self {
            conversion_period: 9,
            base_period: 26,
            span_b_period: 52,
        }
    }
}

fn midpoint(closes: &[f64], period: usize) -> f64 {
    let window = stats::tail(closes, period);
    (stats::max(window) + stats::min(window)) / 2.0
}

impl Ichimoku {
    pub fn calculate(&self, closes: &[f64]) -> Option<IchimokuReading> {
        if closes.len() < self.span_b_period.max(1) {
            return None;
        }

        let conversion = midpoint(closes, self.conversion_period);
        let base = midpoint(closes, self.base_period);
        let span_a = (conversion + base) / 2.0;
        let span_b = midpoint(closes, self.span_b_period);

        let price = closes[closes.len() - 1];
        let position = if price > span_a.max(span_b) {
            CloudPosition::AboveCloud
        } else if price < span_a.min(span_b) {
            CloudPosition::BelowCloud
        } else {
            CloudPosition::InCloud
        };

        let signal = match position {
            CloudPosition::AboveCloud if conversion > base => Bias::Bullish,
            CloudPosition::BelowCloud if conversion < base => Bias::Bearish,
            _ => Bias::Neutral,
        };

        Some(IchimokuReading {
            conversion,
            base,
            span_a,
            span_b,
            position,
            signal,
        })
    }
}
