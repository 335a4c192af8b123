//! Spike detection and prediction from volatility expansion, abnormal
//! momentum and price derivatives.

use super::rules::Scorecard;
use super::{stats, strength, volatility, SyntheticIndex};
use crate::types::{SpikeDirection, SpikePrediction, SpikeResult, SpikeSeverity};

pub const MIN_HISTORY: usize = 50;
/// Probability above this flags a spike.
pub const SPIKE_THRESHOLD: f64 = 55.0;
const MAX_PROBABILITY: f64 = 99.9;

/// Momentum windows with their excess-move threshold (%) and weight.
const MOMENTUM: [(usize, f64, f64, &str); 3] = [
    (3, 0.4, 18.0, "3-BAR MOMENTUM"),
    (5, 0.7, 25.0, "5-BAR MOMENTUM"),
    (10, 1.2, 30.0, "10-BAR MOMENTUM"),
];
const DRIFT_WINDOW: usize = 40;
const CLUSTER_WINDOWS: usize = 40;
const DERIVATIVE_BARS: usize = 25;
const CONSOLIDATION_BARS: usize = 20;

/// Detect or anticipate a spike at the end of `history`.
pub fn detect(history: &[f64], symbol: &str) -> SpikeResult {
    if history.len() < MIN_HISTORY {
        return SpikeResult::placeholder();
    }

    let mut card = Scorecard::new();
    let mut prediction = SpikePrediction::Stable;
    let mut time_to_spike = None;

    let short_ratio = volatility_expansion(history, &mut card);
    abnormal_momentum(history, &mut card);
    volatility_clustering(history, &mut card);
    if let Some(bars) = derivatives(history, &mut card) {
        prediction = SpikePrediction::Imminent;
        time_to_spike = Some(bars);
    }
    if consolidation(history, short_ratio, &mut card) && prediction == SpikePrediction::Stable {
        prediction = SpikePrediction::Building;
    }
    if let Some(index) = SyntheticIndex::from_symbol(symbol) {
        synthetic_spike(history, index, &mut card);
    }
    dispersion(history, &mut card);

    let probability = card.score.clamp(0.0, MAX_PROBABILITY);

    SpikeResult {
        is_spike: probability > SPIKE_THRESHOLD,
        severity: SpikeSeverity::from_probability(probability),
        direction: direction(history),
        probability,
        indicators: card.labels,
        prediction,
        time_to_spike,
    }
}

/// Last 5 bars against the 20, 50 and 100 bars before them. Returns the
/// short-term ratio for the building check.
fn volatility_expansion(history: &[f64], card: &mut Scorecard) -> f64 {
    let v5 = volatility::trailing(history, 5);
    let medium = stats::ratio(v5, volatility::preceding(history, 5, 20));
    let long = stats::ratio(v5, volatility::preceding(history, 5, 50));
    let ultra = stats::ratio(v5, volatility::preceding(history, 5, 100));

    if medium > 2.2 {
        card.add(28.0, "VOLATILITY EXPANSION");
    }
    if long > 3.5 {
        card.add(35.0, "VOLATILITY SURGE");
    }
    if ultra > 5.0 {
        card.add(40.0, "EXTREME VOLATILITY");
    }
    medium
}

/// Move over k bars in excess of the drift the preceding 40 bars would predict.
fn abnormal_momentum(history: &[f64], card: &mut Scorecard) {
    let n = history.len();
    let current = history[n - 1];
    for (k, threshold, weight, label) in MOMENTUM {
        let start = history[n - 1 - k];
        if start == 0.0 {
            continue;
        }
        let moved = (current - start) / start * 100.0;
        let baseline = &history[(n - 1 - k).saturating_sub(DRIFT_WINDOW)..=n - 1 - k];
        let drift = stats::mean(&stats::returns(baseline)) * k as f64 * 100.0;
        if (moved - drift).abs() > threshold {
            card.add(weight, label);
        }
    }
}

/// Latest rolling 5-bar volatility against the mean and spread of the 39 before it.
fn volatility_clustering(history: &[f64], card: &mut Scorecard) {
    let n = history.len();
    let windows = CLUSTER_WINDOWS.min(n - 4);
    let series: Vec<f64> = (0..windows)
        .rev()
        .map(|j| volatility::calculate(&history[n - 5 - j..n - j]))
        .collect();
    let (latest, prior) = match series.split_last() {
        Some((latest, prior)) if !prior.is_empty() => (*latest, prior),
        _ => return,
    };
    let mean = stats::mean(prior);
    let sd = stats::std_dev(prior);

    if latest > mean + 3.0 * sd + stats::EPSILON {
        card.add(25.0, "VOLATILITY CLUSTER (3σ)");
    } else if latest > mean + 2.0 * sd + stats::EPSILON {
        card.add(15.0, "VOLATILITY CLUSTER (2σ)");
    }
}

/// Latest magnitude of a derivative series against the mean of its earlier values.
fn derivative_ratio(series: &[f64]) -> f64 {
    match series.split_last() {
        Some((last, earlier)) if !earlier.is_empty() => {
            let baseline: Vec<f64> = earlier.iter().map(|d| d.abs()).collect();
            stats::ratio(last.abs(), stats::mean(&baseline))
        }
        _ => 0.0,
    }
}

/// Velocity, acceleration, jerk and snap over the last 25 prices. A snap
/// surge returns the estimated bars until the spike.
fn derivatives(history: &[f64], card: &mut Scorecard) -> Option<u32> {
    let window = stats::tail(history, DERIVATIVE_BARS);
    let velocity = stats::deltas(window);
    let acceleration = stats::deltas(&velocity);
    let jerk = stats::deltas(&acceleration);
    let snap = stats::deltas(&jerk);

    if derivative_ratio(&velocity) > 3.0 {
        card.add(15.0, "VELOCITY SURGE");
    }
    if derivative_ratio(&acceleration) > 4.0 {
        card.add(20.0, "ACCELERATION SURGE");
    }
    if derivative_ratio(&jerk) > 5.0 {
        card.add(22.0, "JERK SURGE");
    }
    if derivative_ratio(&snap) > 6.0 {
        card.add(25.0, "SNAP SURGE");
        let current = window[window.len() - 1];
        let snap_pct = snap.last().map_or(0.0, |s| s.abs()) / current.abs().max(stats::EPSILON) * 100.0;
        let bars = if snap_pct > 0.0 { (5.0 / snap_pct).floor() } else { 1.0 };
        return Some(bars.clamp(1.0, u32::MAX as f64) as u32);
    }
    None
}

/// Tight 20-bar base (range under 1% of its mean). Broken by over 1.5x the
/// range is a breakout; mildly elevated short-term volatility inside it is
/// pressure building. Returns true when building.
fn consolidation(history: &[f64], short_ratio: f64, card: &mut Scorecard) -> bool {
    let n = history.len();
    let base = &history[n - 1 - CONSOLIDATION_BARS..n - 1];
    let (high, low) = (stats::max(base), stats::min(base));
    let range = high - low;
    let mean = stats::mean(base);
    if mean <= 0.0 || range >= mean * 0.01 {
        return false;
    }
    let current = history[n - 1];
    if current > high + 1.5 * range || current < low - 1.5 * range {
        card.add(35.0, "CONSOLIDATION BREAKOUT");
        false
    } else if short_ratio > 1.3 && short_ratio <= 2.2 {
        card.add(12.0, "PRESSURE BUILDING");
        true
    } else {
        false
    }
}

/// BOOM spikes up out of oversold quiet, CRASH spikes down out of overbought quiet.
fn synthetic_spike(history: &[f64], index: SyntheticIndex, card: &mut Scorecard) {
    let n = history.len();
    let base = &history[n - 1 - CONSOLIDATION_BARS..n - 1];
    let mean = stats::mean(base);
    if mean > 0.0 && stats::range(base) < mean * 0.003 {
        card.add(15.0, "ULTRA-TIGHT CONSOLIDATION");
    }

    let (previous, current) = (history[n - 2], history[n - 1]);
    if previous == 0.0 {
        return;
    }
    let moved = (current - previous) / previous * 100.0;
    let rsi = strength::calculate(&history[..n - 1]);
    match index {
        SyntheticIndex::Boom if moved > 0.5 && rsi < 35 => {
            card.add(30.0, "BOOM SPIKE CONFIRMED");
        }
        SyntheticIndex::Crash if moved < -0.5 && rsi > 65 => {
            card.add(30.0, "CRASH SPIKE CONFIRMED");
        }
        _ => {}
    }
}

/// Dispersion of the last 10 prices against the last 50.
fn dispersion(history: &[f64], card: &mut Scorecard) {
    let recent = stats::std_dev(stats::tail(history, 10));
    let wider = stats::std_dev(stats::tail(history, 50));
    if stats::ratio(recent, wider) > 1.5 {
        card.add(12.0, "VOLUME PROFILE ANOMALY");
    }
}

/// Sign of the 3-bar average move outside a 0.3%-of-price deadband.
pub fn direction(history: &[f64]) -> SpikeDirection {
    let momentum = stats::mean(&stats::deltas(stats::tail(history, 4)));
    let deadband = stats::mean(stats::tail(history, 20)) * 0.003;
    if momentum > deadband {
        SpikeDirection::Up
    } else if momentum < -deadband {
        SpikeDirection::Down
    } else {
        SpikeDirection::Neutral
    }
}
