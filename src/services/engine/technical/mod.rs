//! Multi-indicator technical suite.
//!
//! Every indicator reads closing prices only. The suite turns the readings
//! into a signed confluence score, a list of signal labels and a 0-100
//! overall strength that starts from RSI.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod fibonacci;
pub mod ichimoku;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;

use super::rules::{Rule, Scorecard};
use super::stats;
use crate::types::{
    AdxReading, AtrReading, Bias, BollingerReading, IchimokuReading, MaAlignment, MacdReading,
    MovingAverages, PivotLevels, StochasticCross, StochasticReading, TechnicalAnalysis, VolatilityState,
};

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ichimoku::Ichimoku;
pub use macd::Macd;
pub use rsi::Rsi;
pub use stochastic::Stochastic;

/// Histories shorter than this get all-neutral readings.
pub const MIN_HISTORY: usize = 200;
pub const MAX_SIGNALS: usize = 8;
const PIVOT_BARS: usize = 50;
const DIVERGENCE_LOOKBACK: usize = 20;

struct Readings {
    price: f64,
    rsi: f64,
    macd: MacdReading,
    bollinger: BollingerReading,
    moving_averages: MovingAverages,
    pivots: PivotLevels,
    divergence: Bias,
    stochastic: StochasticReading,
    atr: AtrReading,
    adx: AdxReading,
    ichimoku: IchimokuReading,
}

const SIGNAL_RULES: [Rule<Readings>; 20] = [
    Rule::new("RSI OVERSOLD", 2.0, |r| r.rsi < 30.0),
    Rule::new("RSI OVERBOUGHT", -2.0, |r| r.rsi > 70.0),
    Rule::new("MACD BULLISH", 1.5, |r| r.macd.trend == Bias::Bullish),
    Rule::new("MACD BEARISH", -1.5, |r| r.macd.trend == Bias::Bearish),
    Rule::new("BELOW LOWER BAND", 1.5, |r| r.bollinger.percent_b < 0.0),
    Rule::new("ABOVE UPPER BAND", -1.5, |r| r.bollinger.percent_b > 1.0),
    Rule::new("BOLLINGER SQUEEZE", 0.0, |r| r.bollinger.squeeze),
    Rule::new("GOLDEN ALIGNMENT", 2.0, |r| r.moving_averages.alignment == MaAlignment::Golden),
    Rule::new("DEATH ALIGNMENT", -2.0, |r| r.moving_averages.alignment == MaAlignment::Death),
    Rule::new("ABOVE R1", 1.0, |r| r.price > r.pivots.resistance1),
    Rule::new("BELOW S1", -1.0, |r| r.price < r.pivots.support1),
    Rule::new("BULLISH DIVERGENCE", 2.5, |r| r.divergence == Bias::Bullish),
    Rule::new("BEARISH DIVERGENCE", -2.5, |r| r.divergence == Bias::Bearish),
    Rule::new("STOCHASTIC BULLISH CROSS", 1.0, |r| r.stochastic.cross == StochasticCross::Bullish),
    Rule::new("STOCHASTIC BEARISH CROSS", -1.0, |r| r.stochastic.cross == StochasticCross::Bearish),
    Rule::new("VOLATILITY EXPANDING", 0.0, |r| r.atr.state == VolatilityState::Expanding),
    Rule::new("STRONG UPTREND (ADX)", 1.5, |r| r.adx.directional_bias() == Bias::Bullish),
    Rule::new("STRONG DOWNTREND (ADX)", -1.5, |r| r.adx.directional_bias() == Bias::Bearish),
    Rule::new("ABOVE CLOUD", 1.5, |r| r.ichimoku.signal == Bias::Bullish),
    Rule::new("BELOW CLOUD", -1.5, |r| r.ichimoku.signal == Bias::Bearish),
];

/// Run the full suite, or return neutral readings below 200 prices.
pub fn analyze(history: &[f64]) -> TechnicalAnalysis {
    if history.len() < MIN_HISTORY {
        return TechnicalAnalysis::neutral();
    }
    evaluate(history).unwrap_or_else(TechnicalAnalysis::neutral)
}

fn evaluate(history: &[f64]) -> Option<TechnicalAnalysis> {
    let n = history.len();
    let rsi = Rsi::default().calculate(history)?;

    let readings = Readings {
        price: history[n - 1],
        rsi,
        macd: Macd::default().calculate(history)?,
        bollinger: BollingerBands::default().calculate(history)?,
        moving_averages: moving_average::alignment(history)?,
        pivots: pivot_levels(&history[n - 1 - PIVOT_BARS..n - 1]),
        divergence: divergence(history, rsi)?,
        stochastic: Stochastic::default().calculate(history)?,
        atr: Atr::default().calculate(history)?,
        adx: Adx::default().calculate(history)?,
        ichimoku: Ichimoku::default().calculate(history)?,
    };
    let fib = fibonacci::levels(history)?;

    let mut card = Scorecard::new();
    card.apply(&SIGNAL_RULES, &readings);
    if let Some(ratio) = fib.nearest {
        card.add(0.0, format!("AT FIB {:.1}%", ratio * 100.0));
    }
    card.labels.truncate(MAX_SIGNALS);

    Some(TechnicalAnalysis {
        rsi,
        macd: readings.macd,
        bollinger: readings.bollinger,
        moving_averages: readings.moving_averages,
        pivots: readings.pivots,
        divergence: readings.divergence,
        stochastic: readings.stochastic,
        atr: readings.atr,
        adx: readings.adx,
        ichimoku: readings.ichimoku,
        fibonacci: fib,
        confluence: card.score,
        overall_strength: overall_strength(&readings),
        signals: card.labels,
    })
}

/// Floor-trader pivots from the high, low and close of `window`.
pub fn pivot_levels(window: &[f64]) -> PivotLevels {
    if window.is_empty() {
        return PivotLevels::default();
    }
    let high = stats::max(window);
    let low = stats::min(window);
    let close = window[window.len() - 1];
    let pivot = (high + low + close) / 3.0;

    PivotLevels {
        pivot,
        resistance1: 2.0 * pivot - low,
        resistance2: pivot + (high - low),
        support1: 2.0 * pivot - high,
        support2: pivot - (high - low),
    }
}

/// Price against RSI 20 bars back. A higher price with lower RSI is bearish
/// divergence, a lower price with higher RSI bullish.
fn divergence(history: &[f64], rsi_now: f64) -> Option<Bias> {
    let n = history.len();
    let earlier = &history[..n - DIVERGENCE_LOOKBACK];
    let rsi_then = Rsi::default().calculate(earlier)?;
    let (price_now, price_then) = (history[n - 1], earlier[earlier.len() - 1]);

    Some(if price_now > price_then && rsi_now < rsi_then {
        Bias::Bearish
    } else if price_now < price_then && rsi_now > rsi_then {
        Bias::Bullish
    } else {
        Bias::Neutral
    })
}

fn signed(bias: Bias, points: f64) -> f64 {
    match bias {
        Bias::Bullish => points,
        Bias::Bearish => -points,
        Bias::Neutral => 0.0,
    }
}

/// RSI adjusted by the trend indicators, clamped to 0-100.
fn overall_strength(r: &Readings) -> f64 {
    let alignment = match r.moving_averages.alignment {
        MaAlignment::Golden => 18.0,
        MaAlignment::Death => -18.0,
        MaAlignment::Mixed => 0.0,
    };
    let band = if r.price > r.bollinger.middle {
        8.0
    } else if r.price < r.bollinger.middle {
        -8.0
    } else {
        0.0
    };

    let strength = r.rsi
        + signed(r.macd.trend, 12.0)
        + alignment
        + band
        + signed(r.adx.directional_bias(), 10.0)
        + signed(r.ichimoku.signal, 10.0);
    strength.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect()
    }

    #[test]
    fn test_short_history_is_neutral() {
        let rising: Vec<f64> = (0..199).map(|i| 100.0 + i as f64).collect();
        assert_eq!(analyze(&rising), TechnicalAnalysis::neutral());
    }

    #[test]
    fn test_uptrend_reads_strong() {
        let rising: Vec<f64> = (0..250).map(|i| 100.0 * 1.005f64.powi(i)).collect();
        let result = analyze(&rising);
        assert_eq!(result.rsi, 100.0);
        assert_eq!(result.overall_strength, 100.0);
        assert_eq!(result.moving_averages.alignment, MaAlignment::Golden);
        assert!(result.confluence > 0.0);
        assert!(result.signals.contains(&"GOLDEN ALIGNMENT".to_string()));
    }

    #[test]
    fn test_downtrend_reads_weak() {
        let falling: Vec<f64> = (0..250).map(|i| 400.0 * 0.995f64.powi(i)).collect();
        let result = analyze(&falling);
        assert_eq!(result.overall_strength, 0.0);
        assert!(result.confluence < 0.0);
        assert_eq!(result.adx.directional_bias(), Bias::Bearish);
    }

    #[test]
    fn test_signals_capped_and_strength_bounded() {
        let result = analyze(&wave(300));
        assert!(result.signals.len() <= MAX_SIGNALS);
        assert!((0.0..=100.0).contains(&result.overall_strength));
    }

    #[test]
    fn test_pivot_levels_ordering() {
        let levels = pivot_levels(&[10.0, 14.0, 8.0, 12.0]);
        assert!((levels.pivot - 34.0 / 3.0).abs() < 1e-9);
        assert!(levels.resistance2 > levels.resistance1);
        assert!(levels.resistance1 > levels.pivot);
        assert!(levels.support1 < levels.pivot);
        assert!(levels.support2 < levels.support1);
    }

    #[test]
    fn test_bearish_divergence() {
        // Sharp rally, pullback, then a slow grind to a marginal new high.
        let mut history: Vec<f64> = vec![100.0; 170];
        history.extend((1..=10).map(|i| 100.0 + i as f64 * 2.0));
        history.extend((1..=5).map(|i| 120.0 - i as f64 * 2.0));
        history.extend((1..=16).map(|i| 110.0 + i as f64 * 0.7));
        let rsi = Rsi::default().calculate(&history).unwrap();
        assert_eq!(divergence(&history, rsi), Some(Bias::Bearish));
    }

    #[test]
    fn test_idempotent() {
        let history = wave(260);
        assert_eq!(analyze(&history), analyze(&history));
    }
}
