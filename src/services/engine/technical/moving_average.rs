//! Simple moving averages and their stacking order.

use super::super::stats;
use crate::types::{MaAlignment, MovingAverages};

/// Mean of the last `period` values, `None` when the series is shorter.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(stats::mean(stats::tail(values, period)))
}

/// 20/50/200 SMAs.
///
/// Golden alignment is ma20 > ma50 > ma200 with price above ma20; death
/// alignment is the mirror image. Anything else is mixed.
pub fn alignment(closes: &[f64]) -> Option<MovingAverages> {
    let ma20 = sma(closes, 20)?;
    let ma50 = sma(closes, 50)?;
    let ma200 = sma(closes, 200)?;
    let price = closes[closes.len() - 1];

    let alignment = if ma20 > ma50 && ma50 > ma200 && price > ma20 {
        MaAlignment::Golden
    } else if ma20 < ma50 && ma50 < ma200 && price < ma20 {
        MaAlignment::Death
    } else {
        MaAlignment::Mixed
    };

    Some(MovingAverages {
        ma20,
        ma50,
        ma200,
        alignment,
    })
}
