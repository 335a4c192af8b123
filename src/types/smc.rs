//! Smart Money Concepts and ICT overlay records.

use serde::{Deserialize, Serialize};

use super::analysis::Bias;

/// Price zone preceding a strong directional move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBlock {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub price: f64,
    /// Size of the displacement as a percentage of the full range.
    pub strength: f64,
    pub institutional: bool,
}

/// Three-bar imbalance left behind by a fast move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueGap {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquiditySide {
    /// Resting orders around swing highs.
    SellSide,
    /// Resting orders around swing lows.
    BuySide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityZone {
    #[serde(rename = "type")]
    pub side: LiquiditySide,
    pub price: f64,
    /// Pivot prominence as a percentage of the full range.
    pub strength: f64,
    /// Number of later revisits within 0.2% of the level.
    pub touches: u32,
    pub swept: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarketStructure {
    #[serde(rename = "HH/HL")]
    HigherHighs,
    #[serde(rename = "LH/LL")]
    LowerLows,
    #[default]
    #[serde(rename = "RANGING")]
    Ranging,
}

impl MarketStructure {
    pub fn bias(&self) -> Bias {
        match self {
            MarketStructure::HigherHighs => Bias::Bullish,
            MarketStructure::LowerLows => Bias::Bearish,
            MarketStructure::Ranging => Bias::Neutral,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketStructure::HigherHighs => "HH/HL",
            MarketStructure::LowerLows => "LH/LL",
            MarketStructure::Ranging => "RANGING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiumDiscount {
    Premium,
    Discount,
    #[default]
    Equilibrium,
}

/// Composite Smart Money Concepts read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmcResult {
    pub signal: String,
    pub trend: Bias,
    /// 0 to 99.9.
    pub accuracy: f64,
    pub market_structure: MarketStructure,
    pub premium_discount: PremiumDiscount,
    pub factors: Vec<String>,
    pub order_blocks: Vec<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub liquidity_zones: Vec<LiquidityZone>,
    pub bos_choch: Vec<String>,
    pub score: f64,
    pub order_flow_bias: Bias,
    pub inducement: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_of_control: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ict: Option<IctResult>,
}

impl SmcResult {
    pub const SYNCHRONIZING: &'static str = "SYNCHRONIZING...";

    pub fn placeholder() -> Self {
        Self {
            signal: Self::SYNCHRONIZING.to_string(),
            trend: Bias::Neutral,
            accuracy: 0.0,
            market_structure: MarketStructure::Ranging,
            premium_discount: PremiumDiscount::Equilibrium,
            factors: Vec::new(),
            order_blocks: Vec::new(),
            fair_value_gaps: Vec::new(),
            liquidity_zones: Vec::new(),
            bos_choch: Vec::new(),
            score: 0.0,
            order_flow_bias: Bias::Neutral,
            inducement: false,
            point_of_control: None,
            ict: None,
        }
    }
}

/// Time-of-day session window, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillZone {
    London,
    NewYork,
    Asia,
    #[default]
    None,
}

impl KillZone {
    /// Kill zone and its strength for a UTC hour.
    pub fn from_utc_hour(hour: u32) -> (Self, u8) {
        match hour {
            7..=10 => (KillZone::London, 95),
            12..=15 => (KillZone::NewYork, 98),
            1..=5 => (KillZone::Asia, 85),
            _ => (KillZone::None, 0),
        }
    }
}

/// Optimal-trade-entry retracement zone of the recent 30-bar leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OteZone {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub in_zone: bool,
    /// 0.62 retracement level.
    pub shallow: f64,
    /// 0.705 retracement level.
    pub optimal: f64,
    /// 0.79 retracement level.
    pub deep: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerBlock {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MitigationBlock {
    #[serde(rename = "type")]
    pub kind: Bias,
    pub price: f64,
    pub validated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerOfThreePhase {
    Accumulation,
    Manipulation,
    Distribution,
    #[default]
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PowerOfThree {
    pub phase: PowerOfThreePhase,
    pub confidence: f64,
    /// Direction of the move behind the phase, if any.
    pub direction: Bias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstitutionalFlow {
    StrongBuy,
    Buy,
    #[default]
    Neutral,
    Sell,
    StrongSell,
}

impl InstitutionalFlow {
    pub fn bias(&self) -> Bias {
        match self {
            InstitutionalFlow::StrongBuy | InstitutionalFlow::Buy => Bias::Bullish,
            InstitutionalFlow::StrongSell | InstitutionalFlow::Sell => Bias::Bearish,
            InstitutionalFlow::Neutral => Bias::Neutral,
        }
    }
}

/// ICT institutional-flow overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IctResult {
    pub kill_zone: KillZone,
    pub kill_zone_strength: u8,
    pub ote_zone: OteZone,
    pub breaker_blocks: Vec<BreakerBlock>,
    pub near_breaker: bool,
    pub mitigation_blocks: Vec<MitigationBlock>,
    pub power_of_three: PowerOfThree,
    pub order_flow: InstitutionalFlow,
    pub optimal_entry: String,
    pub entry_confidence: f64,
    pub session_bias: Bias,
}

impl IctResult {
    pub const WAITING: &'static str = "WAITING";

    /// Neutral overlay; the kill zone still follows the clock.
    pub fn placeholder(kill_zone: KillZone, kill_zone_strength: u8) -> Self {
        Self {
            kill_zone,
            kill_zone_strength,
            ote_zone: OteZone::default(),
            breaker_blocks: Vec::new(),
            near_breaker: false,
            mitigation_blocks: Vec::new(),
            power_of_three: PowerOfThree::default(),
            order_flow: InstitutionalFlow::Neutral,
            optimal_entry: Self::WAITING.to_string(),
            entry_confidence: 0.0,
            session_bias: Bias::Neutral,
        }
    }
}
