//! Multi-timeframe signal composition.
//!
//! Timeframes are trailing slices of one buffer (see [`Timeframe::slice`]).
//! Each slice casts weighted directional votes; the winning side, if it is
//! clear enough, is then scored against the full-history engine report.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ComposerConfig;
use crate::services::engine::rules::{Rule, Scorecard};
use crate::services::engine::technical::{moving_average, Adx, Ichimoku, Macd};
use crate::services::engine::{smc, stats, strength, Engine};
use crate::types::{
    Bias, LiquiditySide, MaAlignment, MarketReport, PowerOfThreePhase, PremiumDiscount, SmcResult, SpikePrediction,
    Timeframe, TimeframeBias, TradeDirection, TradeSignal,
};

/// Winning share of the weighted vote required to emit a signal.
pub const MIN_VOTE_SHARE: f64 = 0.55;
/// Confluence base at a unanimous vote.
pub const MAX_BASE_CONFIDENCE: f64 = 60.0;
pub const MAX_CONFIDENCE: f64 = 99.0;
pub const REWARD_RISK: f64 = 3.0;
/// Synthetic ATR as a share of the full history's range.
const ATR_PROXY: f64 = 0.02;
const TECHNICAL_SIGNAL_BONUS: f64 = 0.015;

/// Components read on one timeframe slice.
struct TimeframeRead {
    strength: Option<u8>,
    smc: SmcResult,
    macd: Bias,
    alignment: MaAlignment,
    ichimoku: Bias,
    adx: Bias,
}

fn premium_discount_bias(zone: PremiumDiscount) -> Bias {
    match zone {
        PremiumDiscount::Discount => Bias::Bullish,
        PremiumDiscount::Premium => Bias::Bearish,
        PremiumDiscount::Equilibrium => Bias::Neutral,
    }
}

fn ma_bias(alignment: MaAlignment) -> Bias {
    match alignment {
        MaAlignment::Golden => Bias::Bullish,
        MaAlignment::Death => Bias::Bearish,
        MaAlignment::Mixed => Bias::Neutral,
    }
}

/// Direction of the latest break of structure, if any.
fn bos_bias(events: &[String]) -> Bias {
    events
        .iter()
        .rev()
        .find_map(|e| match e.as_str() {
            "BOS BULLISH" => Some(Bias::Bullish),
            "BOS BEARISH" => Some(Bias::Bearish),
            _ => None,
        })
        .unwrap_or(Bias::Neutral)
}

type Voter = fn(&TimeframeRead) -> Bias;

const VOTERS: [Voter; 16] = [
    |r| match r.strength {
        Some(s) if s > 55 => Bias::Bullish,
        Some(s) if s < 45 => Bias::Bearish,
        _ => Bias::Neutral,
    },
    |r| r.smc.trend,
    |r| r.smc.market_structure.bias(),
    |r| premium_discount_bias(r.smc.premium_discount),
    |r| r.smc.order_blocks.last().map_or(Bias::Neutral, |b| b.kind),
    |r| r.smc.fair_value_gaps.last().map_or(Bias::Neutral, |g| g.kind),
    |r| bos_bias(&r.smc.bos_choch),
    |r| r.macd,
    |r| ma_bias(r.alignment),
    |r| r.smc.ict.as_ref().map_or(Bias::Neutral, |ict| ict.session_bias),
    |r| r.smc.ict.as_ref().map_or(Bias::Neutral, |ict| ict.order_flow.bias()),
    |r| {
        r.smc
            .ict
            .as_ref()
            .filter(|ict| ict.ote_zone.in_zone)
            .map_or(Bias::Neutral, |ict| ict.ote_zone.kind)
    },
    |r| {
        r.smc
            .ict
            .as_ref()
            .filter(|ict| ict.power_of_three.phase == PowerOfThreePhase::Distribution)
            .map_or(Bias::Neutral, |ict| ict.power_of_three.direction)
    },
    |r| r.smc.order_flow_bias,
    |r| r.ichimoku,
    |r| r.adx,
];

fn read_timeframe(slice: &[f64], symbol: &str, now: DateTime<Utc>) -> TimeframeRead {
    TimeframeRead {
        strength: (slice.len() >= strength::MIN_HISTORY).then(|| strength::calculate(slice)),
        smc: smc::analyze(slice, symbol, now),
        macd: Macd::default().calculate(slice).map_or(Bias::Neutral, |m| m.trend),
        alignment: moving_average::alignment(slice).map_or(MaAlignment::Mixed, |m| m.alignment),
        ichimoku: Ichimoku::default().calculate(slice).map_or(Bias::Neutral, |i| i.signal),
        adx: Adx::default().calculate(slice).map_or(Bias::Neutral, |a| a.directional_bias()),
    }
}

/// Weighted votes of one timeframe slice.
pub fn vote(timeframe: Timeframe, history: &[f64], symbol: &str, now: DateTime<Utc>) -> TimeframeBias {
    let read = read_timeframe(timeframe.slice(history), symbol, now);
    let weight = timeframe.weight();
    let (mut bullish_votes, mut bearish_votes) = (0.0, 0.0);

    for voter in VOTERS {
        match voter(&read) {
            Bias::Bullish => bullish_votes += weight,
            Bias::Bearish => bearish_votes += weight,
            Bias::Neutral => {}
        }
    }

    TimeframeBias {
        timeframe,
        bullish_votes,
        bearish_votes,
        bias: Bias::from_score(bullish_votes - bearish_votes),
    }
}

/// Full-history reads the winning direction is scored against.
struct Confluence {
    report: MarketReport,
    dir: Bias,
    timeframes: Vec<TimeframeBias>,
    /// Recent mean absolute move against the longer-run mean.
    activity: f64,
}

impl Confluence {
    fn ict_aligned(&self, f: impl Fn(&crate::types::IctResult) -> bool) -> bool {
        self.report.smc.ict.as_ref().is_some_and(f)
    }

    fn pattern_tier(&self, low: f64, high: f64) -> bool {
        let pattern = &self.report.pattern;
        pattern.bias == self.dir && pattern.confidence >= low && pattern.confidence < high
    }
}

/// Additive multipliers applied to the confluence base.
const CONFLUENCE_RULES: [Rule<Confluence>; 31] = [
    Rule::new("ORDER BLOCK ALIGNED", 0.06, |c| {
        c.report.smc.order_blocks.last().is_some_and(|b| b.kind == c.dir)
    }),
    Rule::new("INSTITUTIONAL ORDER BLOCK", 0.04, |c| {
        c.report
            .smc
            .order_blocks
            .iter()
            .any(|b| b.institutional && b.kind == c.dir)
    }),
    Rule::new("BOS ALIGNED", 0.05, |c| bos_bias(&c.report.smc.bos_choch) == c.dir),
    Rule::new("CHoCH PRESENT", 0.03, |c| {
        c.report.smc.bos_choch.iter().any(|e| e.starts_with("CHoCH"))
    }),
    Rule::new("FVG ALIGNED", 0.04, |c| {
        c.report.smc.fair_value_gaps.last().is_some_and(|g| g.kind == c.dir)
    }),
    Rule::new("LIQUIDITY SWEEP", 0.05, |c| {
        c.report.smc.liquidity_zones.iter().any(|z| {
            z.swept
                && matches!(
                    (z.side, c.dir),
                    (LiquiditySide::BuySide, Bias::Bullish) | (LiquiditySide::SellSide, Bias::Bearish)
                )
        })
    }),
    Rule::new("STRUCTURE ALIGNED", 0.05, |c| c.report.smc.market_structure.bias() == c.dir),
    Rule::new("PREMIUM/DISCOUNT ALIGNED", 0.04, |c| {
        premium_discount_bias(c.report.smc.premium_discount) == c.dir
    }),
    Rule::new("SMC TREND ALIGNED", 0.05, |c| c.report.smc.trend == c.dir),
    Rule::new("KILL ZONE ACTIVE", 0.03, |c| c.ict_aligned(|ict| ict.kill_zone_strength > 0)),
    Rule::new("OTE ZONE", 0.05, |c| {
        c.ict_aligned(|ict| ict.ote_zone.in_zone && ict.ote_zone.kind == c.dir)
    }),
    Rule::new("OPTIMAL ENTRY", 0.05, |c| c.ict_aligned(|ict| ict.optimal_entry.starts_with("OPTIMAL"))),
    Rule::new("NEAR BREAKER", 0.02, |c| c.ict_aligned(|ict| ict.near_breaker)),
    Rule::new("MITIGATION VALIDATED", 0.02, |c| {
        c.ict_aligned(|ict| ict.mitigation_blocks.iter().any(|m| m.validated && m.kind == c.dir))
    }),
    Rule::new("POWER OF 3 DISTRIBUTION", 0.04, |c| {
        c.ict_aligned(|ict| {
            ict.power_of_three.phase == PowerOfThreePhase::Distribution && ict.power_of_three.direction == c.dir
        })
    }),
    Rule::new("INSTITUTIONAL FLOW", 0.05, |c| c.ict_aligned(|ict| ict.order_flow.bias() == c.dir)),
    Rule::new("SESSION BIAS", 0.04, |c| c.ict_aligned(|ict| ict.session_bias == c.dir)),
    Rule::new("PATTERN ELITE", 0.08, |c| c.pattern_tier(90.0, f64::INFINITY)),
    Rule::new("PATTERN STRONG", 0.05, |c| c.pattern_tier(80.0, 90.0)),
    Rule::new("PATTERN CONFIRMED", 0.03, |c| c.pattern_tier(70.0, 80.0)),
    Rule::new("ELLIOTT IMPULSE", 0.05, |c| {
        let count = &c.report.waves.wave_count;
        count.contains("IMPULSE") && count.contains(c.dir.label())
    }),
    Rule::new("ELLIOTT FIB CONFLUENCE", 0.03, |c| c.report.waves.fibonacci_relationships.len() >= 2),
    Rule::new("WAVE TARGET AHEAD", 0.03, |c| {
        let projection = c.report.waves.projection;
        projection.confidence > 0.0 && (projection.target - c.report.price) * c.dir.sign() > 0.0
    }),
    Rule::new("SPIKE ALIGNED", 0.04, |c| c.report.spike.is_spike && c.report.spike.direction.bias() == c.dir),
    Rule::new("SPIKE IMMINENT", 0.03, |c| {
        c.report.spike.prediction == SpikePrediction::Imminent && c.report.spike.direction.bias() == c.dir
    }),
    Rule::new("SPIKE AGAINST", -0.08, |c| {
        c.report.spike.is_spike && c.report.spike.direction.bias() == c.dir.opposite()
    }),
    Rule::new("TECHNICAL CONFLUENCE", 0.05, |c| Bias::from_score(c.report.technical.confluence) == c.dir),
    Rule::new("VOLUME EXPANSION", 0.03, |c| c.activity > 1.2),
    Rule::new("CLEAN MARKET", 0.04, |c| !c.report.manipulation.detected),
    Rule::new("H4 CORROBORATION", 0.06, |c| {
        c.timeframes
            .iter()
            .any(|t| t.timeframe == Timeframe::H4 && t.bias == c.dir)
    }),
    Rule::new("PERFECT ALIGNMENT", 0.10, |c| c.timeframes.iter().all(|t| t.bias == c.dir)),
];

const MANIPULATION_PENALTY: f64 = -0.10;

/// Winning direction of a weighted vote with its share of all votes cast.
/// `None` on a tie or when the share is under [`MIN_VOTE_SHARE`].
pub fn winning_side(bullish: f64, bearish: f64) -> Option<(TradeDirection, f64)> {
    let total = bullish + bearish;
    if total <= 0.0 || bullish == bearish {
        return None;
    }
    let (direction, winning) = if bullish > bearish {
        (TradeDirection::Buy, bullish)
    } else {
        (TradeDirection::Sell, bearish)
    };
    let share = winning / total;
    (share >= MIN_VOTE_SHARE).then_some((direction, share))
}

/// Stop distance multiplier by confidence tier.
pub fn risk_multiplier(confidence: f64) -> f64 {
    if confidence >= 90.0 {
        1.5
    } else if confidence >= 80.0 {
        1.25
    } else {
        1.0
    }
}

/// `(take_profit, stop_loss)` around `entry` at a fixed reward:risk.
pub fn levels(direction: TradeDirection, entry: f64, risk: f64) -> (f64, f64) {
    let sign = direction.sign();
    (entry + sign * risk * REWARD_RISK, entry - sign * risk)
}

/// Composes trade signals from symbol histories.
pub struct SignalComposer {
    config: ComposerConfig,
}

impl Default for SignalComposer {
    fn default() -> Self {
        Self::new(ComposerConfig::default())
    }
}

impl SignalComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Compose a signal for `symbol`, or `None` when the history is short,
    /// the vote is split or the confidence falls below the floor.
    pub fn compose(&self, symbol: &str, history: &[f64], now: DateTime<Utc>) -> Option<TradeSignal> {
        let symbol = symbol.to_uppercase();
        if history.len() < self.config.min_history {
            debug!("{}: {} prices, need {}", symbol, history.len(), self.config.min_history);
            return None;
        }

        let timeframes: Vec<TimeframeBias> = Timeframe::ALL
            .iter()
            .map(|tf| vote(*tf, history, &symbol, now))
            .collect();
        let bullish: f64 = timeframes.iter().map(|t| t.bullish_votes).sum();
        let bearish: f64 = timeframes.iter().map(|t| t.bearish_votes).sum();

        let Some((direction, share)) = winning_side(bullish, bearish) else {
            debug!("{}: split vote, {:.1} bullish to {:.1} bearish", symbol, bullish, bearish);
            return None;
        };

        let ctx = Confluence {
            report: Engine::analyze(history, &symbol, now),
            dir: direction.bias(),
            timeframes,
            activity: activity(history),
        };

        let mut card = Scorecard::new();
        card.apply(&CONFLUENCE_RULES, &ctx);
        if ctx.report.manipulation.detected {
            card.add(MANIPULATION_PENALTY, format!("MANIPULATED: {}", ctx.report.manipulation.manipulation_type));
        }
        if Bias::from_score(ctx.report.technical.confluence) == ctx.dir {
            for label in &ctx.report.technical.signals {
                card.add(TECHNICAL_SIGNAL_BONUS, format!("TECH: {}", label));
            }
        }

        let base = MAX_BASE_CONFIDENCE * share;
        let confidence = (base * (1.0 + card.score)).clamp(0.0, MAX_CONFIDENCE);
        if confidence < self.config.min_confidence {
            debug!("{}: {} confidence {:.1} below floor", symbol, direction_name(direction), confidence);
            return None;
        }

        let entry = ctx.report.price;
        let risk = stats::range(history) * ATR_PROXY * risk_multiplier(confidence);
        let (take_profit, stop_loss) = levels(direction, entry, risk);

        info!("{}: {} at {:.5} ({:.1}%)", symbol, direction_name(direction), entry, confidence);

        Some(TradeSignal {
            id: Uuid::new_v4(),
            symbol,
            direction,
            confidence,
            entry,
            take_profit,
            stop_loss,
            risk_reward: REWARD_RISK,
            timeframes: ctx.timeframes,
            reasons: card.labels,
            pattern: ctx.report.pattern.label,
            timestamp: now.timestamp_millis(),
        })
    }
}

fn direction_name(direction: TradeDirection) -> &'static str {
    match direction {
        TradeDirection::Buy => "BUY",
        TradeDirection::Sell => "SELL",
    }
}

/// Mean absolute move of the last 10 bars over that of the last 50.
fn activity(history: &[f64]) -> f64 {
    let mean_move = |window: &[f64]| {
        let moves: Vec<f64> = stats::deltas(window).iter().map(|d| d.abs()).collect();
        stats::mean(&moves)
    };
    stats::ratio(mean_move(stats::tail(history, 11)), mean_move(stats::tail(history, 51)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap()
    }

    fn rising(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 * 1.005f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_short_history_skipped() {
        assert!(SignalComposer::default().compose("R_100", &rising(179), now()).is_none());
    }

    #[test]
    fn test_flat_history_is_a_split_vote() {
        assert!(SignalComposer::default().compose("R_100", &vec![100.0; 200], now()).is_none());
    }

    #[test]
    fn test_levels_fixed_reward_risk() {
        let (tp, sl) = levels(TradeDirection::Buy, 100.0, 2.0);
        assert_eq!((tp, sl), (106.0, 98.0));
        let (tp, sl) = levels(TradeDirection::Sell, 100.0, 2.0);
        assert_eq!((tp, sl), (94.0, 102.0));
    }

    #[test]
    fn test_winning_side_needs_clear_share() {
        assert_eq!(winning_side(54.0, 46.0), None);
        assert_eq!(winning_side(46.0, 54.0), None);
        assert_eq!(winning_side(7.5, 7.5), None);
        assert_eq!(winning_side(0.0, 0.0), None);

        let (direction, share) = winning_side(56.0, 44.0).unwrap();
        assert_eq!(direction, TradeDirection::Buy);
        assert!((share - 0.56).abs() < 1e-9);

        let (direction, share) = winning_side(44.0, 56.0).unwrap();
        assert_eq!(direction, TradeDirection::Sell);
        assert!((share - 0.56).abs() < 1e-9);

        assert_eq!(winning_side(0.0, 4.5), Some((TradeDirection::Sell, 1.0)));
    }

    #[test]
    fn test_risk_multiplier_tiers() {
        assert_eq!(risk_multiplier(95.0), 1.5);
        assert_eq!(risk_multiplier(85.0), 1.25);
        assert_eq!(risk_multiplier(72.0), 1.0);
    }

    #[test]
    fn test_short_slice_votes_are_weighted() {
        let history = rising(200);
        let m5 = vote(Timeframe::M5, &history, "R_100", now());
        // Only ADX reads a 30-bar slice.
        assert_eq!(m5.bullish_votes, 1.0);
        assert_eq!(m5.bearish_votes, 0.0);
        assert_eq!(m5.bias, Bias::Bullish);
    }

    #[test]
    fn test_rising_history_composes_buy() {
        let history = rising(200);
        let signal = SignalComposer::default()
            .compose("r_100", &history, now())
            .expect("signal");
        assert_eq!(signal.symbol, "R_100");
        assert_eq!(signal.direction, TradeDirection::Buy);
        assert!(signal.confidence >= 70.0 && signal.confidence <= MAX_CONFIDENCE);
        assert!(signal.take_profit > signal.entry && signal.entry > signal.stop_loss);
        let reward = signal.take_profit - signal.entry;
        let risk = signal.entry - signal.stop_loss;
        assert!((reward / risk - REWARD_RISK).abs() < 1e-9);
        assert_eq!(signal.timeframes.len(), 4);
        assert!(signal.reasons.contains(&"H4 CORROBORATION".to_string()));
        assert_eq!(signal.timestamp, now().timestamp_millis());
    }

    #[test]
    fn test_min_confidence_floor() {
        let composer = SignalComposer::new(ComposerConfig {
            min_confidence: 99.5,
            ..ComposerConfig::default()
        });
        assert!(composer.compose("R_100", &rising(200), now()).is_none());
    }
}
