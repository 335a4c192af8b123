//! Smart Money Concepts structure read with the nested ICT overlay.
//!
//! Every qualitative factor is a signed rule of weight 1.8. The running score
//! picks the signal label; the nested overlay only feeds `accuracy`.

use chrono::{DateTime, Utc};

use super::rules::{Rule, Scorecard};
use super::{ict, stats, strength, volatility, SyntheticIndex};
use crate::types::{
    Bias, FairValueGap, IctResult, LiquiditySide, LiquidityZone, MarketStructure, OrderBlock,
    PremiumDiscount, SmcResult,
};

pub const MIN_HISTORY: usize = 50;

const FACTOR_WEIGHT: f64 = 1.8;
const ELITE_THRESHOLD: f64 = 5.0;
const SIGNAL_THRESHOLD: f64 = 2.5;
const MAX_ACCURACY: f64 = 99.9;
const MAX_ZONES: usize = 5;
const LIQUIDITY_WINDOW: usize = 10;
const STRUCTURE_BARS: usize = 60;
const STRUCTURE_WINDOW: usize = 5;
const POC_BINS: usize = 12;

/// Full SMC read of `history`. `now` reaches the ICT kill zone.
pub fn analyze(history: &[f64], symbol: &str, now: DateTime<Utc>) -> SmcResult {
    if history.len() < MIN_HISTORY {
        return SmcResult::placeholder();
    }

    let order_blocks = order_blocks(history);
    let fair_value_gaps = fair_value_gaps(history);
    let liquidity = liquidity_zones(history);
    let structure = market_structure(history);
    let premium_discount = premium_discount(history);
    let inducement = inducement(history);
    let synthetic = synthetic_setup(history, symbol);
    let order_flow_bias = order_flow_bias(history);
    let (point_of_control, poc_magnet) = point_of_control(history);

    let factors = SmcFactors {
        order_block: order_blocks.last().map(|b| b.kind),
        fair_value_gap: fair_value_gaps.last().map(|g| g.kind),
        sweep: liquidity.sweep,
        pool: liquidity.pool,
        structure: structure.structure,
        bos: structure.bos,
        premium_discount,
        inducement,
        synthetic_phase: synthetic.phase,
        synthetic_ignition: synthetic.ignition,
        order_flow: order_flow_bias,
        poc_magnet,
    };

    let mut card = Scorecard::new();
    card.apply(&FACTOR_RULES, &factors);

    let trend = Bias::from_score(card.score);
    let ict = ict::analyze(history, symbol, now);
    let accuracy = accuracy(
        &card,
        order_blocks.len(),
        fair_value_gaps.len(),
        &ict,
        trend,
    );

    SmcResult {
        signal: signal_label(card.score),
        trend,
        accuracy,
        market_structure: structure.structure,
        premium_discount,
        factors: card.labels,
        order_blocks,
        fair_value_gaps,
        liquidity_zones: liquidity.zones,
        bos_choch: structure.events,
        score: card.score,
        order_flow_bias,
        inducement: inducement.is_some(),
        point_of_control,
        ict: Some(ict),
    }
}

pub fn signal_label(score: f64) -> String {
    let label = if score >= ELITE_THRESHOLD {
        "ELITE SMC BULLISH"
    } else if score <= -ELITE_THRESHOLD {
        "ELITE SMC BEARISH"
    } else if score >= SIGNAL_THRESHOLD {
        "SMC BULLISH"
    } else if score <= -SIGNAL_THRESHOLD {
        "SMC BEARISH"
    } else {
        "NEUTRAL"
    };
    label.to_string()
}

fn accuracy(card: &Scorecard, blocks: usize, gaps: usize, ict: &IctResult, trend: Bias) -> f64 {
    let mut accuracy = 85.0
        + card.labels.len() as f64 * 1.5
        + blocks as f64 * 0.8
        + gaps as f64 * 0.5
        + ict.kill_zone_strength as f64 * 0.02
        + ict.power_of_three.confidence * 0.03;
    if ict.ote_zone.in_zone {
        accuracy += 2.5;
    }
    if trend.is_directional() && ict.order_flow.bias() == trend {
        accuracy += 2.0;
    }
    accuracy.clamp(0.0, MAX_ACCURACY)
}

struct SmcFactors {
    order_block: Option<Bias>,
    fair_value_gap: Option<Bias>,
    sweep: Option<Bias>,
    pool: Option<Bias>,
    structure: MarketStructure,
    bos: Option<Bias>,
    premium_discount: PremiumDiscount,
    inducement: Option<Bias>,
    synthetic_phase: Option<Bias>,
    synthetic_ignition: Option<Bias>,
    order_flow: Bias,
    poc_magnet: Option<Bias>,
}

const W: f64 = FACTOR_WEIGHT;

const FACTOR_RULES: [Rule<SmcFactors>; 24] = [
    Rule::new("BULLISH ORDER BLOCK", W, |f| f.order_block == Some(Bias::Bullish)),
    Rule::new("BEARISH ORDER BLOCK", -W, |f| f.order_block == Some(Bias::Bearish)),
    Rule::new("BULLISH FVG", W, |f| f.fair_value_gap == Some(Bias::Bullish)),
    Rule::new("BEARISH FVG", -W, |f| f.fair_value_gap == Some(Bias::Bearish)),
    Rule::new("BUY-SIDE LIQUIDITY SWEPT", W, |f| f.sweep == Some(Bias::Bullish)),
    Rule::new("SELL-SIDE LIQUIDITY SWEPT", -W, |f| f.sweep == Some(Bias::Bearish)),
    Rule::new("LIQUIDITY POOL ABOVE", W, |f| f.pool == Some(Bias::Bullish)),
    Rule::new("LIQUIDITY POOL BELOW", -W, |f| f.pool == Some(Bias::Bearish)),
    Rule::new("HH/HL STRUCTURE", W, |f| f.structure == MarketStructure::HigherHighs),
    Rule::new("LH/LL STRUCTURE", -W, |f| f.structure == MarketStructure::LowerLows),
    Rule::new("BULLISH BOS", W, |f| f.bos == Some(Bias::Bullish)),
    Rule::new("BEARISH BOS", -W, |f| f.bos == Some(Bias::Bearish)),
    Rule::new("DISCOUNT ZONE", W, |f| f.premium_discount == PremiumDiscount::Discount),
    Rule::new("PREMIUM ZONE", -W, |f| f.premium_discount == PremiumDiscount::Premium),
    Rule::new("BULLISH INDUCEMENT", W, |f| f.inducement == Some(Bias::Bullish)),
    Rule::new("BEARISH INDUCEMENT", -W, |f| f.inducement == Some(Bias::Bearish)),
    Rule::new("BOOM ACCUMULATION", W, |f| f.synthetic_phase == Some(Bias::Bullish)),
    Rule::new("CRASH DISTRIBUTION", -W, |f| f.synthetic_phase == Some(Bias::Bearish)),
    Rule::new("BOOM PRE-IGNITION", W, |f| f.synthetic_ignition == Some(Bias::Bullish)),
    Rule::new("CRASH PRE-IGNITION", -W, |f| f.synthetic_ignition == Some(Bias::Bearish)),
    Rule::new("BULLISH ORDER FLOW", W, |f| f.order_flow == Bias::Bullish),
    Rule::new("BEARISH ORDER FLOW", -W, |f| f.order_flow == Bias::Bearish),
    Rule::new("POC MAGNET ABOVE", W, |f| f.poc_magnet == Some(Bias::Bullish)),
    Rule::new("POC MAGNET BELOW", -W, |f| f.poc_magnet == Some(Bias::Bearish)),
];

/// Bars 20..N-5 followed by a move over 1.5% of range, kept when price
/// later retests within 0.3% or the move exceeds 3% of range.
pub fn order_blocks(history: &[f64]) -> Vec<OrderBlock> {
    let n = history.len();
    let range = stats::range(history);
    let mut blocks = Vec::new();
    if range <= 0.0 || n < 26 {
        return blocks;
    }
    let abs_deltas: Vec<f64> = stats::deltas(history).iter().map(|d| d.abs()).collect();

    for i in 20..n - 5 {
        let price = history[i];
        let displacement = history[i + 1] - price;
        if displacement.abs() <= range * 0.015 || price == 0.0 {
            continue;
        }
        let retested = history[i + 2..]
            .iter()
            .any(|p| ((p - price) / price).abs() <= 0.003);
        if !retested && displacement.abs() <= range * 0.03 {
            continue;
        }

        // abs_deltas[i] is the displacement bar; compare with the 10 before it.
        let baseline = stats::mean(&abs_deltas[i - 10..i]);
        let spike = abs_deltas[i] > baseline * 1.5;
        let continuation = (i + 1..i + 4).all(|k| (history[k + 1] - history[k]) * displacement > 0.0);

        blocks.push(OrderBlock {
            kind: Bias::from_score(displacement),
            price,
            strength: displacement.abs() / range * 100.0,
            institutional: spike && continuation,
        });
    }
    stats::keep_last(blocks, MAX_ZONES)
}

/// Middle bar deviating over 0.2% with an outer gap over 0.8% of range.
pub fn fair_value_gaps(history: &[f64]) -> Vec<FairValueGap> {
    let range = stats::range(history);
    let mut gaps = Vec::new();
    if range <= 0.0 {
        return gaps;
    }
    for i in 1..history.len() - 1 {
        let (before, middle, after) = (history[i - 1], history[i], history[i + 1]);
        if before == 0.0 || ((middle - before) / before).abs() <= 0.002 {
            continue;
        }
        let gap = after - before;
        if gap.abs() > range * 0.008 {
            gaps.push(FairValueGap {
                kind: Bias::from_score(gap),
                start: before,
                end: after,
            });
        }
    }
    stats::keep_last(gaps, MAX_ZONES)
}

pub struct LiquidityRead {
    pub zones: Vec<LiquidityZone>,
    /// Lows swept is bullish, highs swept bearish.
    pub sweep: Option<Bias>,
    /// Direction of a heavily touched pool price is approaching.
    pub pool: Option<Bias>,
}

/// 10-bar swing pivots as liquidity, with sweep and pool targeting.
pub fn liquidity_zones(history: &[f64]) -> LiquidityRead {
    let n = history.len();
    let range = stats::range(history);
    let current = history[n - 1];
    let previous = history[n - 2];

    let pivots = stats::merge_pivots(
        &stats::swing_highs(history, LIQUIDITY_WINDOW),
        &stats::swing_lows(history, LIQUIDITY_WINDOW),
    );

    let mut zones = Vec::new();
    let mut sweep = None;
    let mut pool = None;

    for pivot in &pivots {
        let price = pivot.price;
        if price == 0.0 {
            continue;
        }
        let lo = pivot.index - LIQUIDITY_WINDOW;
        let hi = pivot.index + LIQUIDITY_WINDOW;
        let window = &history[lo..=hi];
        let touches = history[hi + 1..]
            .iter()
            .filter(|p| ((*p - price) / price).abs() <= 0.002)
            .count() as u32;

        let (side, prominence, swept) = match pivot.kind {
            stats::PivotKind::High => (
                LiquiditySide::SellSide,
                price - stats::min(window),
                previous <= price && current > price,
            ),
            stats::PivotKind::Low => (
                LiquiditySide::BuySide,
                stats::max(window) - price,
                previous >= price && current < price,
            ),
        };

        if swept {
            sweep = Some(match side {
                LiquiditySide::SellSide => Bias::Bearish,
                LiquiditySide::BuySide => Bias::Bullish,
            });
        }
        if touches >= 3 && current > 0.0 {
            let distance = (price - current) / current;
            match side {
                LiquiditySide::SellSide if distance > 0.0 && distance < 0.01 => {
                    pool = Some(Bias::Bullish)
                }
                LiquiditySide::BuySide if distance < 0.0 && distance > -0.01 => {
                    pool = Some(Bias::Bearish)
                }
                _ => {}
            }
        }

        zones.push(LiquidityZone {
            side,
            price,
            strength: if range > 0.0 { prominence / range * 100.0 } else { 0.0 },
            touches,
            swept,
        });
    }

    LiquidityRead {
        zones: stats::keep_last(zones, MAX_ZONES),
        sweep,
        pool,
    }
}

pub struct StructureRead {
    pub structure: MarketStructure,
    pub bos: Option<Bias>,
    pub events: Vec<String>,
}

/// HH/HL vs LH/LL over the last 60 bars' 5-bar pivots, plus BOS and CHoCH events.
pub fn market_structure(history: &[f64]) -> StructureRead {
    let window = stats::tail(history, STRUCTURE_BARS);
    let current = window[window.len() - 1];
    let highs = stats::swing_highs(window, STRUCTURE_WINDOW);
    let lows = stats::swing_lows(window, STRUCTURE_WINDOW);
    let mut events = Vec::new();

    let mut structure = MarketStructure::Ranging;
    if highs.len() >= 2 && lows.len() >= 2 {
        let higher_high = highs[highs.len() - 1].price > highs[highs.len() - 2].price;
        let higher_low = lows[lows.len() - 1].price > lows[lows.len() - 2].price;
        structure = match (higher_high, higher_low) {
            (true, true) => MarketStructure::HigherHighs,
            (false, false) => MarketStructure::LowerLows,
            (true, false) => {
                events.push("CHoCH (HH WITH LL)".to_string());
                MarketStructure::Ranging
            }
            (false, true) => {
                events.push("CHoCH (LH WITH HL)".to_string());
                MarketStructure::Ranging
            }
        };
    }

    let mut bos = None;
    if let Some(high) = highs.last() {
        if current > high.price {
            events.push("BOS BULLISH".to_string());
            bos = Some(Bias::Bullish);
        }
    }
    if let Some(low) = lows.last() {
        if current < low.price {
            events.push("BOS BEARISH".to_string());
            bos = Some(Bias::Bearish);
        }
    }

    StructureRead {
        structure,
        bos,
        events,
    }
}

/// Position against equilibrium +/- 15% of the full range.
pub fn premium_discount(history: &[f64]) -> PremiumDiscount {
    let (high, low) = (stats::max(history), stats::min(history));
    let range = high - low;
    let equilibrium = (high + low) / 2.0;
    let current = history[history.len() - 1];
    if current > equilibrium + 0.15 * range {
        PremiumDiscount::Premium
    } else if current < equilibrium - 0.15 * range {
        PremiumDiscount::Discount
    } else {
        PremiumDiscount::Equilibrium
    }
}

/// Fake breakout: a recent bar above 99.5% of the max with price now below
/// 99%, or the mirror at the lows.
pub fn inducement(history: &[f64]) -> Option<Bias> {
    let (high, low) = (stats::max(history), stats::min(history));
    let current = history[history.len() - 1];
    let recent = stats::tail(history, 20);
    if recent.iter().any(|p| *p > high * 0.995) && current < high * 0.99 {
        Some(Bias::Bearish)
    } else if recent.iter().any(|p| *p < low * 1.005) && current > low * 1.01 {
        Some(Bias::Bullish)
    } else {
        None
    }
}

struct SyntheticSetup {
    phase: Option<Bias>,
    ignition: Option<Bias>,
}

/// BOOM/CRASH rules: an RSI extreme in a quiet market, then a break of the
/// 20-bar consolidation.
fn synthetic_setup(history: &[f64], symbol: &str) -> SyntheticSetup {
    let mut setup = SyntheticSetup {
        phase: None,
        ignition: None,
    };
    let Some(index) = SyntheticIndex::from_symbol(symbol) else {
        return setup;
    };
    let n = history.len();
    let rsi = strength::calculate(history);
    let quiet = volatility::trailing(history, 20) < 1.0;
    let base = &history[n - 21..n - 1];
    let current = history[n - 1];

    match index {
        SyntheticIndex::Boom => {
            if rsi < 30 && quiet {
                setup.phase = Some(Bias::Bullish);
            }
            if current > stats::max(base) {
                setup.ignition = Some(Bias::Bullish);
            }
        }
        SyntheticIndex::Crash => {
            if rsi > 70 && quiet {
                setup.phase = Some(Bias::Bearish);
            }
            if current < stats::min(base) {
                setup.ignition = Some(Bias::Bearish);
            }
        }
    }
    setup
}

/// One side's pressure over the last 20 bars exceeding the other by 1.2x.
pub fn order_flow_bias(history: &[f64]) -> Bias {
    let (buy, sell) = stats::pressure(stats::tail(history, 20));
    if buy > sell * 1.2 && buy > 0.0 {
        Bias::Bullish
    } else if sell > buy * 1.2 && sell > 0.0 {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Centre of the fullest of 12 price bins, and the pull toward it when price
/// sits within one bin width.
pub fn point_of_control(history: &[f64]) -> (Option<f64>, Option<Bias>) {
    let (high, low) = (stats::max(history), stats::min(history));
    if high <= low {
        return (None, None);
    }
    let counts = stats::histogram(history, POC_BINS, low, high);
    let width = (high - low) / POC_BINS as f64;
    let mut mode = 0;
    for (i, count) in counts.iter().enumerate() {
        if *count > counts[mode] {
            mode = i;
        }
    }
    let poc = low + width * (mode as f64 + 0.5);
    let current = history[history.len() - 1];
    let magnet = if (current - poc).abs() > width {
        None
    } else if current < poc {
        Some(Bias::Bullish)
    } else if current > poc {
        Some(Bias::Bearish)
    } else {
        None
    };
    (Some(poc), magnet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 13, 0, 0).unwrap()
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 * 1.005f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_placeholder_below_50() {
        let result = analyze(&rising(49), "R_100", clock());
        assert_eq!(result, SmcResult::placeholder());
        assert_eq!(result.signal, "SYNCHRONIZING...");
        assert_eq!(result.accuracy, 0.0);
    }

    #[test]
    fn test_smooth_rise_is_bullish() {
        let result = analyze(&rising(250), "R_100", clock());
        assert_eq!(result.trend, Bias::Bullish);
        assert_eq!(result.premium_discount, PremiumDiscount::Premium);
        assert_eq!(result.order_flow_bias, Bias::Bullish);
        assert!(result.factors.contains(&"BULLISH FVG".to_string()));
        assert!(result.ict.is_some());
    }

    #[test]
    fn test_signal_thresholds() {
        assert_eq!(signal_label(5.4), "ELITE SMC BULLISH");
        assert_eq!(signal_label(3.6), "SMC BULLISH");
        assert_eq!(signal_label(1.8), "NEUTRAL");
        assert_eq!(signal_label(-3.6), "SMC BEARISH");
        assert_eq!(signal_label(-7.2), "ELITE SMC BEARISH");
    }

    #[test]
    fn test_premium_discount_zones() {
        let mut history: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        assert_eq!(premium_discount(&history), PremiumDiscount::Premium);
        history.push(101.0);
        assert_eq!(premium_discount(&history), PremiumDiscount::Discount);
        history.push(124.5);
        assert_eq!(premium_discount(&history), PremiumDiscount::Equilibrium);
    }

    #[test]
    fn test_fair_value_gap() {
        let mut history = vec![100.0; 30];
        history.extend([100.0, 102.0, 104.0, 104.0]);
        let gaps = fair_value_gaps(&history);
        assert!(!gaps.is_empty());
        assert_eq!(gaps[0].kind, Bias::Bullish);
    }

    #[test]
    fn test_order_block_with_displacement() {
        let mut history = vec![100.0; 30];
        history.extend([105.0, 105.0, 105.0, 105.0, 105.0, 105.0]);
        let blocks = order_blocks(&history);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, Bias::Bullish);
        assert_eq!(blocks[0].price, 100.0);
        assert!(!blocks[0].institutional);
    }

    #[test]
    fn test_market_structure_higher_highs() {
        // Rising zigzag: highs and lows both step up.
        let history: Vec<f64> = (0..80)
            .map(|i| 100.0 + i as f64 * 0.2 + ((i % 12) as f64 - 6.0).abs() * -0.5)
            .collect();
        let read = market_structure(&history);
        assert_eq!(read.structure, MarketStructure::HigherHighs);
    }

    #[test]
    fn test_liquidity_sweep_of_highs() {
        let mut history: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.25).sin()).collect();
        let peak = liquidity_zones(&history)
            .zones
            .iter()
            .filter(|z| z.side == LiquiditySide::SellSide)
            .map(|z| z.price)
            .last()
            .unwrap();
        history.push(peak - 0.1);
        history.push(peak + 0.1);
        let read = liquidity_zones(&history);
        assert_eq!(read.sweep, Some(Bias::Bearish));
        assert!(read.zones.iter().any(|z| z.swept));
    }

    #[test]
    fn test_accuracy_clamped() {
        // Violent oscillation trips many factors at once.
        let history: Vec<f64> = (0..200)
            .map(|i| 100.0 + if i % 2 == 0 { 5.0 } else { -5.0 } + i as f64 * 0.01)
            .collect();
        let result = analyze(&history, "BOOM1000", clock());
        assert!(result.accuracy <= 99.9);
        assert!(result.accuracy >= 0.0);
    }

    #[test]
    fn test_idempotent() {
        let history = rising(120);
        assert_eq!(
            analyze(&history, "R_100", clock()),
            analyze(&history, "R_100", clock())
        );
    }
}
