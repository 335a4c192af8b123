//! Harmonic and swing-structure pattern recognition.
//!
//! Harmonics read five pseudo-pivots taken at fixed offsets into the history
//! (X at the start, A at the dominant extreme, B at 45%, C at 70%, D at the
//! end). Swing scans use real 8-bar pivots. The best candidate is then
//! corroborated against the Elliott count, SMC trend and volatility.

use chrono::{DateTime, Utc};

use super::stats::{self, Pivot, PivotKind};
use super::{elliott, smc, volatility};
use crate::types::{Bias, PatternResult, WaveAnalysis};

pub const MIN_HISTORY: usize = 80;
const SWING_WINDOW: usize = 8;
const MAX_CONFIDENCE: f64 = 99.9;
const DEFAULT_CONFIDENCE: f64 = 75.0;
const STRUCTURAL_BIAS: &str = "STRUCTURAL BIAS";

/// Outputs of other components that corroborate a pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    pub waves: &'a WaveAnalysis,
    pub smc_trend: Bias,
}

/// Run the Elliott and SMC reads, then recognize.
pub fn analyze(history: &[f64], symbol: &str, now: DateTime<Utc>) -> PatternResult {
    if history.len() < MIN_HISTORY {
        return PatternResult::placeholder();
    }
    let waves = elliott::analyze(history);
    let smc = smc::analyze(history, symbol, now);
    recognize(
        history,
        &PatternContext {
            waves: &waves,
            smc_trend: smc.trend,
        },
    )
}

pub fn recognize(history: &[f64], ctx: &PatternContext<'_>) -> PatternResult {
    if history.len() < MIN_HISTORY {
        return PatternResult::placeholder();
    }

    let legs = Legs::from_history(history);
    let pivots = stats::merge_pivots(
        &stats::swing_highs(history, SWING_WINDOW),
        &stats::swing_lows(history, SWING_WINDOW),
    );

    let candidates = [
        best_harmonic(&legs),
        three_drives(&pivots),
        wolfe_wave(&pivots),
        elliott_impulse(&pivots),
        head_and_shoulders(&pivots),
    ];
    let best = candidates
        .into_iter()
        .flatten()
        .fold(None::<Candidate>, |best, c| match best {
            Some(b) if b.confidence >= c.confidence => Some(b),
            _ => Some(c),
        });

    let (mut label, mut confidence, bias, is_default) = match best {
        Some(c) => (c.label, c.confidence, c.bias, false),
        None => {
            let net = Bias::from_score(history[history.len() - 1] - history[0]);
            let label = match net {
                Bias::Bullish => "INSTITUTIONAL ASCENT".to_string(),
                Bias::Bearish => "INSTITUTIONAL DESCENT".to_string(),
                Bias::Neutral => STRUCTURAL_BIAS.to_string(),
            };
            (label, DEFAULT_CONFIDENCE, net, true)
        }
    };

    confidence += corroboration(history, ctx, bias);
    confidence = confidence.clamp(0.0, MAX_CONFIDENCE);

    if confidence >= 90.0 && !is_default {
        label = format!("{} ({})", label, ctx.waves.degree.label());
    }

    PatternResult {
        label,
        confidence,
        bias,
    }
}

/// Confidence bonuses from volatility, the wave count and SMC trend.
fn corroboration(history: &[f64], ctx: &PatternContext<'_>, bias: Bias) -> f64 {
    let mut bonus = 0.0;
    let v20 = volatility::trailing(history, 20);
    let v60 = volatility::trailing(history, 60);
    let agreement = stats::ratio(v20, v60);
    if (0.8..=1.25).contains(&agreement) {
        bonus += 2.0;
    }

    let waves = ctx.waves;
    bonus += waves.projection.confidence * 0.15;
    if waves.fibonacci_relationships.len() >= 2 {
        bonus += 8.0;
    }
    if waves.wave_personality.len() >= 2 {
        bonus += 5.0;
    }
    if waves.alternation && waves.equality {
        bonus += 6.0;
    }

    match (bias, ctx.smc_trend) {
        (Bias::Bullish, Bias::Bullish) => bonus += 5.0,
        (Bias::Bearish, Bias::Bearish) => bonus += 4.0,
        _ => {}
    }
    if v20 < 1.0 {
        bonus += 3.0;
    }
    bonus
}

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    label: String,
    confidence: f64,
    bias: Bias,
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

/// Leg ratios between the X, A, B, C, D pseudo-pivots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Legs {
    /// AB retracement of XA.
    pub ab: f64,
    /// BC retracement of AB.
    pub bc: f64,
    /// CD extension of BC.
    pub cd: f64,
    /// AD retracement of XA.
    pub ad: f64,
    /// XD as a multiple of XA.
    pub xd: f64,
    /// CD relative to AB.
    pub cd_ab: f64,
    /// Direction of XA.
    pub xa_sign: f64,
}

impl Legs {
    pub fn from_history(history: &[f64]) -> Self {
        let n = history.len();
        let x = history[0];
        let (high, low) = (stats::max(history), stats::min(history));
        let a = if high - x >= x - low { high } else { low };
        let b = history[((n - 1) as f64 * 0.45) as usize];
        let c = history[((n - 1) as f64 * 0.70) as usize];
        let d = history[n - 1];
        Self::from_points(x, a, b, c, d)
    }

    pub fn from_points(x: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        let xa = (a - x).abs();
        let ab = (b - a).abs();
        let bc = (c - b).abs();
        let cd = (d - c).abs();
        Self {
            ab: safe_div(ab, xa),
            bc: safe_div(bc, ab),
            cd: safe_div(cd, bc),
            ad: safe_div((d - a).abs(), xa),
            xd: safe_div((d - x).abs(), xa),
            cd_ab: safe_div(cd, ab),
            xa_sign: (a - x).signum(),
        }
    }
}

type Ratio = fn(&Legs) -> f64;

/// `(ratio, low, high, tolerance)`; a point target has `low == high`.
type Check = (Ratio, f64, f64, f64);

const fn check(ratio: Ratio, low: f64, high: f64, tolerance: f64) -> Check {
    (ratio, low, high, tolerance)
}

struct Harmonic {
    name: &'static str,
    base: f64,
    checks: &'static [Check],
}

const HARMONICS: [Harmonic; 9] = [
    Harmonic {
        name: "GARTLEY",
        base: 82.0,
        checks: &[
            check(|l| l.ab, 0.618, 0.618, 0.008),
            check(|l| l.bc, 0.382, 0.886, 0.008),
            check(|l| l.ad, 0.786, 0.786, 0.008),
        ],
    },
    Harmonic {
        name: "BAT",
        base: 83.0,
        checks: &[
            check(|l| l.ab, 0.382, 0.5, 0.005),
            check(|l| l.bc, 0.382, 0.886, 0.005),
            check(|l| l.ad, 0.886, 0.886, 0.005),
        ],
    },
    Harmonic {
        name: "BUTTERFLY",
        base: 84.0,
        checks: &[
            check(|l| l.ab, 0.786, 0.786, 0.005),
            check(|l| l.ad, 1.272, 1.618, 0.006),
        ],
    },
    Harmonic {
        name: "CRAB",
        base: 85.0,
        checks: &[
            check(|l| l.ab, 0.382, 0.618, 0.004),
            check(|l| l.ad, 1.618, 1.618, 0.004),
        ],
    },
    Harmonic {
        name: "DEEP CRAB",
        base: 86.0,
        checks: &[
            check(|l| l.ab, 0.886, 0.886, 0.003),
            check(|l| l.ad, 1.618, 1.618, 0.003),
        ],
    },
    Harmonic {
        name: "CYPHER",
        base: 84.0,
        checks: &[
            check(|l| l.bc, 1.272, 1.414, 0.006),
            check(|l| l.cd, 0.786, 0.786, 0.006),
        ],
    },
    Harmonic {
        name: "SHARK",
        base: 83.0,
        checks: &[
            check(|l| l.bc, 1.13, 1.618, 0.007),
            check(|l| l.cd, 1.618, 2.24, 0.007),
        ],
    },
    Harmonic {
        name: "AB=CD",
        base: 80.0,
        checks: &[
            check(|l| l.bc, 0.382, 0.886, 0.008),
            check(|l| l.cd_ab, 1.0, 1.0, 0.008),
        ],
    },
    Harmonic {
        name: "5-0",
        base: 81.0,
        checks: &[
            check(|l| l.bc, 1.618, 2.24, 0.007),
            check(|l| l.cd, 0.5, 0.5, 0.007),
        ],
    },
];

/// Best-matching harmonic. Tighter fits earn up to 8 points of depth bonus.
fn best_harmonic(legs: &Legs) -> Option<Candidate> {
    if legs.xa_sign == 0.0 {
        return None;
    }
    let bias = Bias::from_score(legs.xa_sign);
    HARMONICS
        .iter()
        .filter_map(|h| {
            let mut closeness = Vec::with_capacity(h.checks.len());
            for (ratio, low, high, tol) in h.checks {
                closeness.push(stats::within_band(ratio(legs), *low, *high, *tol)?);
            }
            Some(Candidate {
                label: format!("{} {}", bias.label(), h.name),
                confidence: h.base + stats::mean(&closeness) * 8.0,
                bias,
            })
        })
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(b) if b.confidence >= c.confidence => Some(b),
            _ => Some(c),
        })
}

fn prices(pivots: &[Pivot], kind: PivotKind) -> Vec<f64> {
    pivots.iter().filter(|p| p.kind == kind).map(|p| p.price).collect()
}

fn last_n<T: Copy>(items: &[T], n: usize) -> Option<&[T]> {
    (items.len() >= n).then(|| &items[items.len() - n..])
}

/// Three successive drives of roughly equal size (within 15% of their mean).
fn three_drives(pivots: &[Pivot]) -> Option<Candidate> {
    let recent = last_n(pivots, 6)?;
    if !stats::alternates(recent) {
        return None;
    }
    let p: Vec<f64> = recent.iter().map(|pt| pt.price).collect();
    let drives = [p[1] - p[0], p[3] - p[2], p[5] - p[4]];
    let sizes: Vec<f64> = drives.iter().map(|d| d.abs()).collect();
    let mean = stats::mean(&sizes);
    if mean == 0.0 || sizes.iter().any(|s| (s - mean).abs() / mean > 0.15) {
        return None;
    }
    let ascending = p[1] < p[3] && p[3] < p[5] && drives.iter().all(|d| *d > 0.0);
    let descending = p[1] > p[3] && p[3] > p[5] && drives.iter().all(|d| *d < 0.0);
    let bias = if ascending {
        Bias::Bearish
    } else if descending {
        Bias::Bullish
    } else {
        return None;
    };
    Some(Candidate {
        label: format!("{} THREE DRIVES", bias.label()),
        confidence: 82.0,
        bias,
    })
}

/// Converging wedge: peaks and troughs moving the same way with a shrinking spread.
fn wolfe_wave(pivots: &[Pivot]) -> Option<Candidate> {
    let highs = prices(pivots, PivotKind::High);
    let lows = prices(pivots, PivotKind::Low);
    let h = last_n(&highs, 3)?;
    let l = last_n(&lows, 3)?;
    let contracting = (h[2] - l[2]) < (h[0] - l[0]);
    let falling = h[0] > h[1] && h[1] > h[2] && l[0] > l[1] && l[1] > l[2];
    let rising = h[0] < h[1] && h[1] < h[2] && l[0] < l[1] && l[1] < l[2];
    let bias = match (contracting, falling, rising) {
        (true, true, _) => Bias::Bullish,
        (true, _, true) => Bias::Bearish,
        _ => return None,
    };
    Some(Candidate {
        label: format!("{} WOLFE WAVE", bias.label()),
        confidence: 80.0,
        bias,
    })
}

/// Five peaks and four troughs whose last six pivots form a motive wave
/// with wave 3 not the shortest.
fn elliott_impulse(pivots: &[Pivot]) -> Option<Candidate> {
    let highs = prices(pivots, PivotKind::High);
    let lows = prices(pivots, PivotKind::Low);
    if highs.len() < 5 || lows.len() < 4 {
        return None;
    }
    let recent = last_n(pivots, 6)?;
    if !stats::alternates(recent) {
        return None;
    }
    let p: Vec<f64> = recent.iter().map(|pt| pt.price).collect();
    let (w1, w3, w5) = (p[1] - p[0], p[3] - p[2], p[5] - p[4]);
    let sign = w1.signum();
    if sign == 0.0 || w3 * sign <= 0.0 || w5 * sign <= 0.0 {
        return None;
    }
    // Progress: each motive high beyond the last, corrections holding above the origin.
    if (p[3] - p[1]) * sign <= 0.0 || (p[5] - p[3]) * sign <= 0.0 || (p[2] - p[0]) * sign <= 0.0 {
        return None;
    }
    if w3.abs() < w1.abs().min(w5.abs()) {
        return None;
    }
    let bias = Bias::from_score(sign);
    Some(Candidate {
        label: format!("{} ELLIOTT IMPULSE", bias.label()),
        confidence: 84.0,
        bias,
    })
}

/// Head above (or below) two shoulders that sit within 5% of each other.
fn head_and_shoulders(pivots: &[Pivot]) -> Option<Candidate> {
    let highs = prices(pivots, PivotKind::High);
    if let Some(h) = last_n(&highs, 3) {
        if h[1] > h[0] && h[1] > h[2] && (h[0] - h[2]).abs() / h[0].max(h[2]) <= 0.05 {
            return Some(Candidate {
                label: "HEAD & SHOULDERS".to_string(),
                confidence: 86.0,
                bias: Bias::Bearish,
            });
        }
    }
    let lows = prices(pivots, PivotKind::Low);
    if let Some(l) = last_n(&lows, 3) {
        if l[1] < l[0] && l[1] < l[2] && (l[0] - l[2]).abs() / l[0].max(l[2]) <= 0.05 {
            return Some(Candidate {
                label: "INVERSE HEAD & SHOULDERS".to_string(),
                confidence: 86.0,
                bias: Bias::Bullish,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap()
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 * 1.005f64.powi(i as i32)).collect()
    }

    fn no_waves() -> WaveAnalysis {
        WaveAnalysis::placeholder()
    }

    /// Linear interpolation through `(bar, price)` anchors.
    fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
        let mut out = Vec::new();
        for w in anchors.windows(2) {
            let (i0, p0) = w[0];
            let (i1, p1) = w[1];
            for i in i0..i1 {
                out.push(p0 + (p1 - p0) * (i - i0) as f64 / (i1 - i0) as f64);
            }
        }
        out.push(anchors[anchors.len() - 1].1);
        out
    }

    #[test]
    fn test_calibrating_below_80() {
        let waves = no_waves();
        let ctx = PatternContext {
            waves: &waves,
            smc_trend: Bias::Neutral,
        };
        assert_eq!(recognize(&rising(79), &ctx), PatternResult::placeholder());
        assert_eq!(analyze(&rising(79), "R_100", clock()).label, "CALIBRATING...");
    }

    #[test]
    fn test_default_relabelled_by_direction() {
        let waves = no_waves();
        let ctx = PatternContext {
            waves: &waves,
            smc_trend: Bias::Neutral,
        };
        let result = recognize(&rising(120), &ctx);
        assert_eq!(result.label, "INSTITUTIONAL ASCENT");
        assert_eq!(result.bias, Bias::Bullish);
        // Base 75 plus the low-volatility bonus.
        assert!(result.confidence >= 75.0);

        let falling: Vec<f64> = rising(120).into_iter().rev().collect();
        assert_eq!(recognize(&falling, &ctx).label, "INSTITUTIONAL DESCENT");
    }

    #[test]
    fn test_smc_agreement_bonus() {
        let waves = no_waves();
        let history = rising(120);
        let neutral = recognize(
            &history,
            &PatternContext {
                waves: &waves,
                smc_trend: Bias::Neutral,
            },
        );
        let agreeing = recognize(
            &history,
            &PatternContext {
                waves: &waves,
                smc_trend: Bias::Bullish,
            },
        );
        assert!((agreeing.confidence - neutral.confidence - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_gartley_ratios() {
        // X=100, A=110, B=103.82 (0.618), C=107 (bc ~0.515), D=102.14 (ad 0.786).
        let legs = Legs::from_points(100.0, 110.0, 103.82, 107.0, 102.14);
        let candidate = best_harmonic(&legs).unwrap();
        assert_eq!(candidate.label, "BULLISH GARTLEY");
        assert!(candidate.confidence > 82.0);
    }

    #[test]
    fn test_no_harmonic_on_random_ratios() {
        let legs = Legs::from_points(100.0, 110.0, 101.0, 109.0, 104.0);
        assert!(best_harmonic(&legs).is_none());
    }

    #[test]
    fn test_head_and_shoulders() {
        let history = path(&[
            (0, 100.0),
            (10, 105.0),
            (20, 101.0),
            (30, 110.0),
            (40, 101.0),
            (50, 105.2),
            (60, 100.0),
            (90, 99.0),
        ]);
        let pivots = stats::merge_pivots(
            &stats::swing_highs(&history, SWING_WINDOW),
            &stats::swing_lows(&history, SWING_WINDOW),
        );
        let candidate = head_and_shoulders(&pivots).unwrap();
        assert_eq!(candidate.label, "HEAD & SHOULDERS");
        assert_eq!(candidate.bias, Bias::Bearish);
    }

    #[test]
    fn test_high_confidence_gets_degree_suffix() {
        let mut waves = no_waves();
        waves.projection.confidence = 99.0;
        waves.fibonacci_relationships = vec!["A".into(), "B".into()];
        let history = path(&[
            (0, 100.0),
            (10, 105.0),
            (20, 101.0),
            (30, 110.0),
            (40, 101.0),
            (50, 105.2),
            (60, 100.0),
            (90, 99.0),
        ]);
        let result = recognize(
            &history,
            &PatternContext {
                waves: &waves,
                smc_trend: Bias::Bearish,
            },
        );
        assert!(result.confidence <= 99.9);
        assert!(result.label.ends_with("(MINUTE)"), "got {}", result.label);
    }

    #[test]
    fn test_idempotent() {
        let history = rising(150);
        assert_eq!(
            analyze(&history, "R_100", clock()),
            analyze(&history, "R_100", clock())
        );
    }
}
