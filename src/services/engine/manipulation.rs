//! Abnormal price behaviour: stop hunts, liquidity grabs, Wyckoff events.

use super::rules::Scorecard;
use super::{stats, volatility};
use crate::types::ManipulationResult;

pub const MIN_HISTORY: usize = 30;

/// One check's contribution. Footprint-only checks carry no label.
#[derive(Debug, Clone, PartialEq)]
struct Finding {
    label: Option<&'static str>,
    severity: u32,
    footprint: f64,
}

impl Finding {
    fn flag(label: &'static str, severity: u32, footprint: f64) -> Option<Self> {
        Some(Self {
            label: Some(label),
            severity,
            footprint,
        })
    }

    fn footprint(footprint: f64) -> Option<Self> {
        Some(Self {
            label: None,
            severity: 0,
            footprint,
        })
    }
}

type Check = fn(&[f64]) -> Option<Finding>;

/// Evaluated in order; the first labelled finding names the result.
const CHECKS: [Check; 12] = [
    stop_hunt,
    volatility_cascade,
    liquidity_grab,
    order_flow_imbalance,
    institutional_footprint,
    smart_money_divergence,
    volume_cluster,
    wyckoff_accumulation,
    whipsaw,
    spring_upthrust,
    no_demand_supply,
    absorption,
];

/// Flag abnormal behaviour in `history`.
pub fn detect(history: &[f64]) -> ManipulationResult {
    if history.len() < MIN_HISTORY {
        return ManipulationResult::placeholder();
    }

    // Severity carries the labels; footprint-only findings just bump it.
    let mut severity = Scorecard::new();
    let mut footprint = Scorecard::new();

    for check in CHECKS {
        if let Some(finding) = check(history) {
            match finding.label {
                Some(label) => severity.add(finding.severity as f64, label),
                None => severity.bump(finding.severity as f64),
            }
            footprint.bump(finding.footprint);
        }
    }

    let manipulation_type = severity
        .first_label()
        .unwrap_or(ManipulationResult::ORGANIC)
        .to_string();

    ManipulationResult {
        detected: severity.score > 0.0,
        manipulation_type,
        severity: severity.score as u32,
        indicators: severity.labels,
        institutional_footprint: footprint.score,
    }
}

fn last(history: &[f64]) -> f64 {
    history[history.len() - 1]
}

/// Last-bar return against the preceding 30-price baseline, graded 3/4.5/6 sigma.
fn stop_hunt(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    let returns = stats::returns(history);
    let r_last = returns[returns.len() - 1];
    let baseline = stats::returns(&history[n.saturating_sub(31)..n - 1]);
    let z = (r_last - stats::mean(&baseline)).abs() / (stats::std_dev(&baseline) + stats::EPSILON);

    if z > 6.0 {
        Finding::flag("HFT STOP HUNT (6σ)", 3, 25.0)
    } else if z > 4.5 {
        Finding::flag("HFT STOP HUNT (4.5σ)", 2, 18.0)
    } else if z > 3.0 {
        Finding::flag("HFT STOP HUNT (3σ)", 1, 10.0)
    } else {
        None
    }
}

/// Each window's volatility against the longer window before it.
fn volatility_cascade(history: &[f64]) -> Option<Finding> {
    let v10 = volatility::trailing(history, 10);
    let v30 = volatility::preceding(history, 10, 30);
    let v60 = volatility::preceding(history, 40, 60);
    if stats::ratio(v10, v30) > 2.0 && stats::ratio(v30, v60) > 1.5 {
        Finding::flag("VOLATILITY CASCADE", 2, 15.0)
    } else {
        None
    }
}

/// Penultimate bar pierces the recent extreme, last bar reverts inside.
/// Highs look back 20 bars, lows 15.
fn liquidity_grab(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    let probe = history[n - 2];
    let close = history[n - 1];
    let high = stats::max(&history[n.saturating_sub(22)..n - 2]);
    let low = stats::min(&history[n.saturating_sub(17)..n - 2]);

    if probe > high && close < high {
        Finding::flag("LIQUIDITY GRAB (HIGHS)", 2, 15.0)
    } else if probe < low && close > low {
        Finding::flag("LIQUIDITY GRAB (LOWS)", 2, 15.0)
    } else {
        None
    }
}

fn order_flow_imbalance(history: &[f64]) -> Option<Finding> {
    let (buy, sell) = stats::pressure(stats::tail(history, 30));
    let total = buy + sell;
    if total > stats::EPSILON && (buy - sell).abs() / total > 0.7 {
        Finding::footprint(10.0)
    } else {
        None
    }
}

/// More than 15% of recent bars move over 4% of the window range.
fn institutional_footprint(history: &[f64]) -> Option<Finding> {
    let window = stats::tail(history, 30);
    let range = stats::range(window);
    if range <= 0.0 {
        return None;
    }
    let deltas = stats::deltas(window);
    let large = deltas.iter().filter(|d| d.abs() > range * 0.04).count();
    if large as f64 / deltas.len() as f64 > 0.15 {
        Finding::footprint(20.0)
    } else {
        None
    }
}

/// Price trend and volatility trend pointing opposite ways.
fn smart_money_divergence(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    let window = stats::tail(history, 20);
    let change = (last(window) - window[0]) / window[0];
    let price_dir = if change > 0.002 {
        1
    } else if change < -0.002 {
        -1
    } else {
        0
    };

    let recent = volatility::calculate(&history[n - 15..]);
    let previous = volatility::calculate(&history[n - 30..n - 15]);
    let deadband = previous * 0.1 + stats::EPSILON;
    let vol_dir = if recent - previous > deadband {
        1
    } else if previous - recent > deadband {
        -1
    } else {
        0
    };

    if price_dir != 0 && vol_dir != 0 && price_dir != vol_dir {
        Finding::flag("SMART MONEY DIVERGENCE", 1, 8.0)
    } else {
        None
    }
}

/// One of 10 price bins holding over 3.5x the average count.
fn volume_cluster(history: &[f64]) -> Option<Finding> {
    let window = stats::tail(history, 50);
    let counts = stats::histogram(window, 10, stats::min(window), stats::max(window));
    let average = window.len() as f64 / 10.0;
    let peak = counts.iter().copied().max().unwrap_or(0) as f64;
    if stats::range(window) > 0.0 && peak > average * 3.5 {
        Finding::flag("VOLUME CLUSTER ANOMALY", 1, 10.0)
    } else {
        None
    }
}

/// Last quarter far more volatile than the first, average price unchanged.
fn wyckoff_accumulation(history: &[f64]) -> Option<Finding> {
    let window = stats::tail(history, 60);
    let quarter = window.len() / 4;
    let first = &window[..quarter];
    let fourth = &window[window.len() - quarter..];
    let (m1, m4) = (stats::mean(first), stats::mean(fourth));
    let stable = m1 > 0.0 && ((m4 - m1) / m1).abs() < 0.02;
    if stats::ratio(volatility::calculate(fourth), volatility::calculate(first)) > 2.5 && stable {
        Finding::flag("WYCKOFF ACCUMULATION", 1, 12.0)
    } else {
        None
    }
}

fn whipsaw(history: &[f64]) -> Option<Finding> {
    let window = stats::tail(history, 30);
    let range = stats::range(window);
    if range <= 0.0 {
        return None;
    }
    let deltas = stats::deltas(window);
    let pairs = deltas.len() - 1;
    let reversals = deltas
        .windows(2)
        .filter(|d| d[0] * d[1] < 0.0 && d[0].abs() > range * 0.02 && d[1].abs() > range * 0.02)
        .count();
    if reversals as f64 / pairs as f64 > 0.4 {
        Finding::flag("WHIPSAW", 1, 5.0)
    } else {
        None
    }
}

/// Brief penetration of the 35-bar base during the last 5 bars, then a close back inside.
fn spring_upthrust(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    if n < 40 {
        return None;
    }
    let base = &history[n - 40..n - 5];
    let recent = &history[n - 5..];
    let (low, high) = (stats::min(base), stats::max(base));
    let close = last(history);

    if stats::min(recent) < low * 0.999 && close > low {
        Finding::flag("WYCKOFF SPRING", 2, 15.0)
    } else if stats::max(recent) > high * 1.001 && close < high {
        Finding::flag("WYCKOFF UPTHRUST", 2, 15.0)
    } else {
        None
    }
}

/// Narrow last bar far from the 50-bar mean.
fn no_demand_supply(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    let spread = (history[n - 1] - history[n - 2]).abs();
    let average: Vec<f64> = stats::deltas(stats::tail(history, 21)).iter().map(|d| d.abs()).collect();
    let average = stats::mean(&average);
    let mean = stats::mean(stats::tail(history, 50));
    let close = last(history);
    if mean <= 0.0 || spread >= average * 0.3 || ((close - mean) / mean).abs() <= 0.02 {
        return None;
    }
    if close > mean {
        Finding::flag("NO DEMAND", 1, 5.0)
    } else {
        Finding::flag("NO SUPPLY", 1, 5.0)
    }
}

/// A 3x-average bar four bars back, followed by three near-silent bars.
fn absorption(history: &[f64]) -> Option<Finding> {
    let n = history.len();
    let abs_deltas: Vec<f64> = stats::deltas(history).iter().map(|d| d.abs()).collect();
    // abs_deltas[k] is the move into bar k + 1.
    let shock = abs_deltas.len() - 4;
    let baseline = stats::mean(&abs_deltas[shock.saturating_sub(20)..shock]);
    let after = stats::mean(&abs_deltas[shock + 1..]);
    if n > 25 && abs_deltas[shock] > baseline * 3.0 && after < baseline * 0.3 {
        Finding::flag("ABSORPTION", 1, 10.0)
    } else {
        None
    }
}
