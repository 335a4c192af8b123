//! RSI-style technical strength over the last 14 prices.

use super::stats;

/// Histories shorter than this read as neutral.
pub const MIN_HISTORY: usize = 40;
pub const WINDOW: usize = 14;
/// Reading for short histories and for a window with no movement at all.
/// A loss floor of 1 would read such a window as 0; it has no direction.
pub const NEUTRAL: u8 = 50;

/// Technical strength 0 to 100.
///
/// Sums gains and losses over the window without Wilder smoothing. A window
/// with no losses saturates at 100; a flat window reads neutral.
pub fn calculate(history: &[f64]) -> u8 {
    if history.len() < MIN_HISTORY {
        return NEUTRAL;
    }

    let (gains, losses) = stats::pressure(stats::tail(history, WINDOW));

    if losses == 0.0 {
        return if gains == 0.0 { NEUTRAL } else { 100 };
    }

    let rsi = 100.0 - 100.0 / (1.0 + gains / losses);
    rsi.round().clamp(0.0, 100.0) as u8
}
