//! ICT institutional-flow overlay: kill zones, OTE, breakers, Power of 3.

use chrono::{DateTime, Timelike, Utc};

use super::rules::{self, Rule, Scorecard};
use super::{stats, volatility};
use crate::types::{
    Bias, BreakerBlock, IctResult, InstitutionalFlow, KillZone, MitigationBlock, OteZone,
    PowerOfThree, PowerOfThreePhase,
};

pub const MIN_HISTORY: usize = 50;

const OTE_WINDOW: usize = 30;
const FLOW_WINDOW: usize = 40;
const MAX_BLOCKS: usize = 5;

/// Run the overlay. `now` drives the kill zone only; everything else is a
/// function of `history`. The symbol is accepted for parity with the SMC call
/// and does not change the overlay.
pub fn analyze(history: &[f64], _symbol: &str, now: DateTime<Utc>) -> IctResult {
    let (kill_zone, kill_zone_strength) = kill_zone(now);
    if history.len() < MIN_HISTORY {
        return IctResult::placeholder(kill_zone, kill_zone_strength);
    }

    let current = history[history.len() - 1];
    let ote_zone = ote_zone(history);
    let breaker_blocks = breaker_blocks(history);
    let nearest_breaker = breaker_blocks
        .iter()
        .rev()
        .find(|b| current > 0.0 && ((b.price - current) / current).abs() < 0.005)
        .map(|b| b.kind);
    let mitigation_blocks = mitigation_blocks(history);
    let power_of_three = power_of_three(history);
    let order_flow = order_flow(history);

    let (optimal_entry, entry_confidence) =
        optimal_entry(&ote_zone, kill_zone_strength, &power_of_three);

    let session = SessionContext {
        ote: ote_zone,
        flow: order_flow,
        power_of_three,
        near_breaker: nearest_breaker,
    };
    let session_bias = session_bias(&session);

    IctResult {
        kill_zone,
        kill_zone_strength,
        ote_zone,
        breaker_blocks,
        near_breaker: nearest_breaker.is_some(),
        mitigation_blocks,
        power_of_three,
        order_flow,
        optimal_entry,
        entry_confidence,
        session_bias,
    }
}

/// Session window for the UTC hour of `now`.
pub fn kill_zone(now: DateTime<Utc>) -> (KillZone, u8) {
    KillZone::from_utc_hour(now.hour())
}

/// 0.62 / 0.705 / 0.79 retracements of the last 30 bars. Below the midpoint
/// the zone is a bullish retracement of the up-leg, above it a bearish one.
pub fn ote_zone(history: &[f64]) -> OteZone {
    let window = stats::tail(history, OTE_WINDOW);
    let (high, low) = (stats::max(window), stats::min(window));
    let range = high - low;
    if range <= 0.0 {
        return OteZone::default();
    }
    let current = window[window.len() - 1];
    let mid = (high + low) / 2.0;

    if current < mid {
        let (shallow, optimal, deep) = (high - 0.62 * range, high - 0.705 * range, high - 0.79 * range);
        OteZone {
            kind: Bias::Bullish,
            in_zone: current >= deep && current <= shallow,
            shallow,
            optimal,
            deep,
        }
    } else {
        let (shallow, optimal, deep) = (low + 0.62 * range, low + 0.705 * range, low + 0.79 * range);
        OteZone {
            kind: Bias::Bearish,
            in_zone: current >= shallow && current <= deep,
            shallow,
            optimal,
            deep,
        }
    }
}

/// Levels broken by more than 0.5% within 5 bars, then crossed back within bars 5 to 10.
pub fn breaker_blocks(history: &[f64]) -> Vec<BreakerBlock> {
    let n = history.len();
    let mut blocks = Vec::new();
    if n < 41 {
        return blocks;
    }
    for i in 30..n - 10 {
        let level = history[i];
        let ahead = &history[i + 1..=i + 5];
        let later = &history[i + 5..=i + 10];
        if ahead.iter().any(|p| *p > level * 1.005) && later.iter().any(|p| *p < level) {
            blocks.push(BreakerBlock {
                kind: Bias::Bullish,
                price: level,
            });
        } else if ahead.iter().any(|p| *p < level * 0.995) && later.iter().any(|p| *p > level) {
            blocks.push(BreakerBlock {
                kind: Bias::Bearish,
                price: level,
            });
        }
    }
    stats::keep_last(blocks, MAX_BLOCKS)
}

/// Origins of moves larger than 1.5% of range, validated once price revisits
/// them within 0.3%.
pub fn mitigation_blocks(history: &[f64]) -> Vec<MitigationBlock> {
    let range = stats::range(history);
    let mut blocks = Vec::new();
    if range <= 0.0 {
        return blocks;
    }
    for i in 0..history.len() - 1 {
        let origin = history[i];
        let displacement = history[i + 1] - origin;
        if displacement.abs() <= range * 0.015 || origin == 0.0 {
            continue;
        }
        let validated = history[i + 2..]
            .iter()
            .any(|p| ((p - origin) / origin).abs() <= 0.003);
        blocks.push(MitigationBlock {
            kind: Bias::from_score(displacement),
            price: origin,
            validated,
        });
    }
    stats::keep_last(blocks, MAX_BLOCKS)
}

struct PhaseContext {
    v10_over_v30: f64,
    v10: f64,
    v30: f64,
    compressed: bool,
    shock: bool,
    monotonic: bool,
}

/// Later matches override earlier ones.
const PHASE_RULES: [Rule<PhaseContext>; 3] = [
    Rule::new("ACCUMULATION", 70.0, |c| c.v30 < 0.3 && c.v10 < 0.25 && c.compressed),
    Rule::new("MANIPULATION", 80.0, |c| c.shock && c.v10_over_v30 > 1.5),
    Rule::new("DISTRIBUTION", 85.0, |c| {
        c.v10_over_v30 > 2.0 && c.monotonic && !(c.shock && c.v10_over_v30 > 1.5)
    }),
];

fn phase_for(label: &str) -> PowerOfThreePhase {
    match label {
        "ACCUMULATION" => PowerOfThreePhase::Accumulation,
        "MANIPULATION" => PowerOfThreePhase::Manipulation,
        "DISTRIBUTION" => PowerOfThreePhase::Distribution,
        _ => PowerOfThreePhase::Undefined,
    }
}

pub fn power_of_three(history: &[f64]) -> PowerOfThree {
    let last10 = stats::tail(history, 10);
    let v10 = volatility::calculate(last10);
    let v30 = volatility::trailing(history, 30);
    let total_range = stats::range(history);
    let shock = stats::returns(stats::tail(history, 6))
        .iter()
        .any(|r| r.abs() > 0.01);
    let deltas = stats::deltas(last10);
    let monotonic = deltas.iter().all(|d| *d > 0.0) || deltas.iter().all(|d| *d < 0.0);

    // Expansion is measured against the bars before the last ten.
    let ctx = PhaseContext {
        v10_over_v30: stats::ratio(v10, volatility::preceding(history, 10, 30)),
        v10,
        v30,
        compressed: stats::range(last10) < total_range * 0.15,
        shock,
        monotonic,
    };

    match rules::last_match(&PHASE_RULES, &ctx) {
        Some(rule) => PowerOfThree {
            phase: phase_for(rule.label),
            confidence: rule.weight,
            direction: Bias::from_score(last10[last10.len() - 1] - last10[0]),
        },
        None => PowerOfThree::default(),
    }
}

/// Buy/sell pressure ratio over the last 40 bars with a signed count of large moves.
pub fn order_flow(history: &[f64]) -> InstitutionalFlow {
    let window = stats::tail(history, FLOW_WINDOW);
    let (buy, sell) = stats::pressure(window);
    if buy + sell <= stats::EPSILON {
        return InstitutionalFlow::Neutral;
    }
    let threshold = stats::range(window) * 0.01;
    let large: i32 = stats::deltas(window)
        .iter()
        .filter(|d| d.abs() > threshold)
        .map(|d| if *d > 0.0 { 1 } else { -1 })
        .sum();
    let ratio = buy / sell.max(stats::EPSILON);

    if ratio > 1.8 && large >= 3 {
        InstitutionalFlow::StrongBuy
    } else if ratio > 1.3 {
        InstitutionalFlow::Buy
    } else if ratio < 0.55 && large <= -3 {
        InstitutionalFlow::StrongSell
    } else if ratio < 0.77 {
        InstitutionalFlow::Sell
    } else {
        InstitutionalFlow::Neutral
    }
}

fn optimal_entry(ote: &OteZone, kill_zone_strength: u8, p3: &PowerOfThree) -> (String, f64) {
    if !ote.in_zone || kill_zone_strength == 0 {
        return (IctResult::WAITING.to_string(), 0.0);
    }
    if p3.phase == PowerOfThreePhase::Distribution && p3.direction == ote.kind {
        let confidence = 92.0 + 0.05 * kill_zone_strength as f64;
        (format!("OPTIMAL {} ENTRY", ote.kind.label()), confidence)
    } else if kill_zone_strength >= 90 {
        (format!("{} ENTRY ZONE", ote.kind.label()), 85.0)
    } else {
        (IctResult::WAITING.to_string(), 0.0)
    }
}

struct SessionContext {
    ote: OteZone,
    flow: InstitutionalFlow,
    power_of_three: PowerOfThree,
    near_breaker: Option<Bias>,
}

const SESSION_RULES: [Rule<SessionContext>; 10] = [
    Rule::new("OTE BULLISH", 2.0, |c| c.ote.in_zone && c.ote.kind == Bias::Bullish),
    Rule::new("OTE BEARISH", -2.0, |c| c.ote.in_zone && c.ote.kind == Bias::Bearish),
    Rule::new("STRONG BUY FLOW", 3.0, |c| c.flow == InstitutionalFlow::StrongBuy),
    Rule::new("BUY FLOW", 1.0, |c| c.flow == InstitutionalFlow::Buy),
    Rule::new("STRONG SELL FLOW", -3.0, |c| c.flow == InstitutionalFlow::StrongSell),
    Rule::new("SELL FLOW", -1.0, |c| c.flow == InstitutionalFlow::Sell),
    Rule::new("DISTRIBUTION UP", 2.0, |c| {
        c.power_of_three.phase == PowerOfThreePhase::Distribution
            && c.power_of_three.direction == Bias::Bullish
    }),
    Rule::new("DISTRIBUTION DOWN", -2.0, |c| {
        c.power_of_three.phase == PowerOfThreePhase::Distribution
            && c.power_of_three.direction == Bias::Bearish
    }),
    Rule::new("NEAR BULLISH BREAKER", 1.0, |c| c.near_breaker == Some(Bias::Bullish)),
    Rule::new("NEAR BEARISH BREAKER", -1.0, |c| c.near_breaker == Some(Bias::Bearish)),
];

fn session_bias(ctx: &SessionContext) -> Bias {
    let mut card = Scorecard::new();
    card.apply(&SESSION_RULES, ctx);
    if card.score >= 4.0 {
        Bias::Bullish
    } else if card.score <= -4.0 {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, hour, 30, 0).unwrap()
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 * 1.005f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_kill_zone_by_hour() {
        assert_eq!(kill_zone(at_hour(8)), (KillZone::London, 95));
        assert_eq!(kill_zone(at_hour(13)), (KillZone::NewYork, 98));
        assert_eq!(kill_zone(at_hour(3)), (KillZone::Asia, 85));
        assert_eq!(kill_zone(at_hour(20)), (KillZone::None, 0));
        assert_eq!(kill_zone(at_hour(11)), (KillZone::None, 0));
    }

    #[test]
    fn test_kill_zone_ignores_prices() {
        let a = analyze(&rising(60), "R_100", at_hour(9));
        let b = analyze(&vec![42.0; 60], "R_100", at_hour(9));
        assert_eq!(a.kill_zone, b.kill_zone);
        assert_eq!(a.kill_zone_strength, b.kill_zone_strength);
    }

    #[test]
    fn test_short_history_placeholder_keeps_clock() {
        let result = analyze(&rising(49), "R_100", at_hour(13));
        assert_eq!(result, IctResult::placeholder(KillZone::NewYork, 98));
    }

    #[test]
    fn test_ote_bullish_retracement() {
        // 30-bar leg from 100 to 110, then a pullback to 103.
        let mut history: Vec<f64> = (0..29).map(|i| 100.0 + i as f64 * 10.0 / 28.0).collect();
        history.push(103.0);
        let zone = ote_zone(&history);
        assert_eq!(zone.kind, Bias::Bullish);
        assert!(zone.in_zone);
        assert!((zone.optimal - 102.95).abs() < 1e-9);
    }

    #[test]
    fn test_order_flow_one_sided() {
        assert_eq!(order_flow(&rising(60)), InstitutionalFlow::StrongBuy);
        let falling: Vec<f64> = rising(60).into_iter().rev().collect();
        assert_eq!(order_flow(&falling), InstitutionalFlow::StrongSell);
        assert_eq!(order_flow(&vec![100.0; 60]), InstitutionalFlow::Neutral);
    }

    #[test]
    fn test_power_of_three_distribution_overrides() {
        let mut history = vec![100.0; 60];
        for i in 1..=10 {
            history.push(100.0 + i as f64 * 0.5);
        }
        let p3 = power_of_three(&history);
        assert_eq!(p3.phase, PowerOfThreePhase::Distribution);
        assert_eq!(p3.direction, Bias::Bullish);
        assert_eq!(p3.confidence, 85.0);
    }

    #[test]
    fn test_power_of_three_manipulation() {
        let mut history: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.5).sin() * 0.05).collect();
        history.push(102.0);
        history.push(100.0);
        let p3 = power_of_three(&history);
        assert_eq!(p3.phase, PowerOfThreePhase::Manipulation);
    }

    #[test]
    fn test_breaker_block_detected() {
        let mut history = vec![100.0; 40];
        history.extend([100.0, 101.0, 101.5, 100.5, 100.0, 99.0, 99.0, 99.0, 99.0, 99.0, 99.0]);
        history.extend(vec![99.0; 10]);
        let blocks = breaker_blocks(&history);
        assert!(blocks.iter().any(|b| b.kind == Bias::Bullish && b.price == 100.0));
    }

    #[test]
    fn test_session_bias_on_strong_trend() {
        let mut history = vec![100.0; 60];
        for i in 1..=10 {
            history.push(100.0 + i as f64 * 0.5);
        }
        let result = analyze(&history, "R_100", at_hour(20));
        // Strong buy flow (+3) and bullish distribution (+2).
        assert_eq!(result.session_bias, Bias::Bullish);
        assert_eq!(result.optimal_entry, IctResult::WAITING);
    }

    #[test]
    fn test_idempotent() {
        let history = rising(120);
        assert_eq!(
            analyze(&history, "R_100", at_hour(8)),
            analyze(&history, "R_100", at_hour(8))
        );
    }
}
