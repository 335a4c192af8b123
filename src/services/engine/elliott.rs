//! Elliott wave counting over strength-filtered swing pivots.

use super::stats::{self, Pivot, PivotKind};
use crate::types::{WaveAnalysis, WaveDegree, WaveProjection};

pub const MIN_HISTORY: usize = 100;
const PIVOT_WINDOW: usize = 10;
/// A pivot must sit at least this far (relative) from its window extremum.
const PIVOT_MIN_STRENGTH: f64 = 0.008;
const EQUALITY_TOLERANCE: f64 = 0.15;
const ZIGZAG_TOLERANCE: f64 = 0.12;
const MAX_CONFIDENCE: f64 = 99.0;

/// Count waves in `history`.
pub fn analyze(history: &[f64]) -> WaveAnalysis {
    if history.len() < MIN_HISTORY {
        return WaveAnalysis::placeholder();
    }

    let current = history[history.len() - 1];
    let degree = degree_for(stats::range(history), current);
    let pivots = strong_pivots(history);

    if pivots.len() >= 9 {
        let recent = &pivots[pivots.len() - 9..];
        if stats::alternates(recent) {
            if let Some(mut analysis) = read_impulse(&recent[3..]) {
                analysis.degree = degree;
                return analysis;
            }
        }
    }

    if let Some(mut analysis) = read_correction(&pivots) {
        analysis.degree = degree;
        return analysis;
    }

    WaveAnalysis {
        wave_count: "NO CLEAR COUNT".to_string(),
        degree,
        wave_personality: Vec::new(),
        fibonacci_relationships: Vec::new(),
        projection: WaveProjection {
            target: current,
            confidence: 0.0,
        },
        alternation: false,
        equality: false,
    }
}

/// Degree from total range as a percentage of the current price.
pub fn degree_for(range: f64, current: f64) -> WaveDegree {
    let pct = if current != 0.0 { range / current.abs() * 100.0 } else { 0.0 };
    if pct < 2.0 {
        WaveDegree::Minute
    } else if pct < 5.0 {
        WaveDegree::Minor
    } else if pct < 10.0 {
        WaveDegree::Intermediate
    } else {
        WaveDegree::Primary
    }
}

/// 10-bar swing pivots that deviate at least 0.8% from the window extremum.
pub fn strong_pivots(history: &[f64]) -> Vec<Pivot> {
    let keep = |pivot: &Pivot| {
        let lo = pivot.index.saturating_sub(PIVOT_WINDOW);
        let hi = (pivot.index + PIVOT_WINDOW).min(history.len() - 1);
        let window = &history[lo..=hi];
        let strength = match pivot.kind {
            PivotKind::High => (pivot.price - stats::min(window)) / pivot.price,
            PivotKind::Low => (stats::max(window) - pivot.price) / pivot.price,
        };
        strength >= PIVOT_MIN_STRENGTH
    };

    let highs: Vec<Pivot> = stats::swing_highs(history, PIVOT_WINDOW)
        .into_iter()
        .filter(keep)
        .collect();
    let lows: Vec<Pivot> = stats::swing_lows(history, PIVOT_WINDOW)
        .into_iter()
        .filter(keep)
        .collect();
    stats::merge_pivots(&highs, &lows)
}

/// Validate a 5-wave impulse over six alternating pivots.
fn read_impulse(points: &[Pivot]) -> Option<WaveAnalysis> {
    if points.len() != 6 {
        return None;
    }
    let p: Vec<f64> = points.iter().map(|pt| pt.price).collect();
    let waves: Vec<f64> = p.windows(2).map(|w| w[1] - w[0]).collect();
    let sign = waves[0].signum();
    if sign == 0.0 {
        return None;
    }
    // Motive waves move with wave 1, corrective waves against it.
    let directions_ok = waves
        .iter()
        .enumerate()
        .all(|(i, w)| if i % 2 == 0 { w * sign > 0.0 } else { w * sign < 0.0 });
    if !directions_ok {
        return None;
    }

    let l: Vec<f64> = waves.iter().map(|w| w.abs()).collect();
    let (l1, l2, l3, l4, l5) = (l[0], l[1], l[2], l[3], l[4]);

    // Hard rules: wave 3 not shorter than 1 and 5, wave 2 inside wave 1,
    // wave 4 out of wave 1 territory.
    if l3 < l1 || l3 < l5 {
        return None;
    }
    let r2 = l2 / l1;
    if r2 >= 1.0 {
        return None;
    }
    if (p[4] - p[1]) * sign <= 0.0 {
        return None;
    }
    let r4 = l4 / l3;

    let mut confidence: f64 = 50.0;
    let mut relationships = Vec::new();
    let mut personality = Vec::new();

    if stats::within(l3 / l1, 1.618, 0.1).is_some() {
        relationships.push("WAVE 3 = 1.618 x WAVE 1".to_string());
        confidence += 12.0;
    }
    if (0.5..=0.618).contains(&r2) {
        relationships.push("WAVE 2 RETRACES 50-61.8%".to_string());
        confidence += 8.0;
    }
    if stats::within(r4, 0.382, 0.05).is_some() {
        relationships.push("WAVE 4 RETRACES 38.2% OF WAVE 3".to_string());
        confidence += 8.0;
    }
    let equality = (l5 / l1 - 1.0).abs() <= EQUALITY_TOLERANCE;
    if equality {
        relationships.push("WAVE 5 = WAVE 1".to_string());
        confidence += 10.0;
    }
    let alternation = (r2 < 0.5 && r4 > 0.5) || (r2 > 0.5 && r4 < 0.5);
    if alternation {
        personality.push("ALTERNATION".to_string());
        confidence += 6.0;
    }

    if l3 > 1.618 * l1 {
        personality.push("EXTENDED WAVE 3".to_string());
    }
    if r2 > 0.618 {
        personality.push("DEEP WAVE 2".to_string());
    } else if r2 < 0.382 {
        personality.push("SHALLOW WAVE 2".to_string());
    }
    if r4 > 0.5 {
        personality.push("DEEP WAVE 4".to_string());
    } else if r4 < 0.382 {
        personality.push("SHALLOW WAVE 4".to_string());
    }
    if (p[5] - p[3]) * sign < 0.0 {
        personality.push("TRUNCATED WAVE 5".to_string());
    }

    let targets = [
        p[4] + sign * l1,
        p[4] + sign * 1.618 * l4,
        p[0] + sign * 1.618 * l3,
    ];
    let target = stats::mean(&targets);

    let direction = if sign > 0.0 { "BULLISH" } else { "BEARISH" };
    Some(WaveAnalysis {
        wave_count: format!("5-WAVE IMPULSE ({})", direction),
        degree: WaveDegree::Minute,
        wave_personality: personality,
        fibonacci_relationships: relationships,
        projection: WaveProjection {
            target,
            confidence: confidence.min(MAX_CONFIDENCE),
        },
        alternation,
        equality,
    })
}

/// Zigzag, flat, then contracting triangle over the most recent pivots.
fn read_correction(pivots: &[Pivot]) -> Option<WaveAnalysis> {
    if pivots.len() < 4 {
        return None;
    }
    let recent = &pivots[pivots.len() - 4..];
    if !stats::alternates(recent) {
        return None;
    }
    let p: Vec<f64> = recent.iter().map(|pt| pt.price).collect();
    let a = p[1] - p[0];
    let la = a.abs();
    let lb = (p[2] - p[1]).abs();
    let lc = (p[3] - p[2]).abs();
    if la == 0.0 {
        return None;
    }

    let build = |count: &str, relationship: Option<&str>, confidence: f64, target: f64| WaveAnalysis {
        wave_count: count.to_string(),
        degree: WaveDegree::Minute,
        wave_personality: vec!["CORRECTIVE".to_string()],
        fibonacci_relationships: relationship.map(|r| vec![r.to_string()]).unwrap_or_default(),
        projection: WaveProjection {
            target,
            confidence: confidence.min(MAX_CONFIDENCE),
        },
        alternation: false,
        equality: false,
    };

    if (lc / la - 1.0).abs() <= ZIGZAG_TOLERANCE && lb < la {
        return Some(build(
            "ZIGZAG A-B-C",
            Some("WAVE C = WAVE A"),
            65.0,
            p[2] + a.signum() * la,
        ));
    }
    if lb >= 0.9 * la {
        return Some(build(
            "FLAT A-B-C",
            Some("WAVE B RETRACES 90%+ OF WAVE A"),
            55.0,
            p[2] + a.signum() * la,
        ));
    }

    if pivots.len() >= 5 {
        let five = &pivots[pivots.len() - 5..];
        if stats::alternates(five) {
            let legs: Vec<f64> = five.windows(2).map(|w| (w[1].price - w[0].price).abs()).collect();
            if legs.windows(2).all(|w| w[1] < w[0]) {
                let thrust = (five[1].price - five[0].price).signum() * legs[0];
                return Some(build("CONTRACTING TRIANGLE", None, 50.0, p[3] + thrust));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear interpolation through `(bar, price)` anchors.
    fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
        let mut out = Vec::new();
        for w in anchors.windows(2) {
            let (i0, p0) = w[0];
            let (i1, p1) = w[1];
            for i in i0..i1 {
                let t = (i - i0) as f64 / (i1 - i0) as f64;
                out.push(p0 + (p1 - p0) * t);
            }
        }
        out.push(anchors[anchors.len() - 1].1);
        out
    }

    fn impulse_history() -> Vec<f64> {
        // Leading swings, then waves 0..5: 100 -> 110 -> 104 -> 120 -> 116 -> 126.
        path(&[
            (0, 102.0),
            (15, 108.0),
            (30, 96.0),
            (45, 106.0),
            (60, 100.0),
            (75, 110.0),
            (90, 104.0),
            (105, 120.0),
            (120, 116.0),
            (135, 126.0),
            (150, 120.0),
        ])
    }

    #[test]
    fn test_insufficient_history() {
        let result = analyze(&vec![100.0; 99]);
        assert_eq!(result, WaveAnalysis::placeholder());
    }

    #[test]
    fn test_flat_history_has_no_count() {
        let result = analyze(&vec![100.0; 150]);
        assert_eq!(result.wave_count, "NO CLEAR COUNT");
        assert_eq!(result.projection.target, 100.0);
        assert_eq!(result.degree, WaveDegree::Minute);
    }

    #[test]
    fn test_strong_pivots_on_zigzag_path() {
        let history = impulse_history();
        let pivots = strong_pivots(&history);
        assert!(stats::alternates(&pivots));
        let prices: Vec<f64> = pivots.iter().map(|p| p.price).collect();
        assert!(prices.contains(&96.0));
        assert!(prices.contains(&126.0));
    }

    #[test]
    fn test_impulse_detected() {
        let history = impulse_history();
        let result = analyze(&history);
        assert_eq!(result.wave_count, "5-WAVE IMPULSE (BULLISH)");
        assert!(result.projection.confidence >= 50.0);
        assert!(result.projection.confidence <= 99.0);
        assert!(result.projection.target > 110.0);
        assert!(!result.wave_personality.is_empty());
    }

    #[test]
    fn test_degree_bands() {
        assert_eq!(degree_for(1.0, 100.0), WaveDegree::Minute);
        assert_eq!(degree_for(3.0, 100.0), WaveDegree::Minor);
        assert_eq!(degree_for(7.0, 100.0), WaveDegree::Intermediate);
        assert_eq!(degree_for(30.0, 100.0), WaveDegree::Primary);
    }

    #[test]
    fn test_idempotent() {
        let history = impulse_history();
        assert_eq!(analyze(&history), analyze(&history));
    }
}
