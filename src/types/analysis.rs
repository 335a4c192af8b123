use serde::{Deserialize, Serialize};

use super::smc::SmcResult;

/// Directional lean of an analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Bias {
    /// Bias from the sign of a score. Zero is neutral.
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Bias::Bullish
        } else if score < 0.0 {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }

    /// +1 for bullish, -1 for bearish, 0 for neutral.
    pub fn sign(&self) -> f64 {
        match self {
            Bias::Bullish => 1.0,
            Bias::Bearish => -1.0,
            Bias::Neutral => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bias::Bullish => "BULLISH",
            Bias::Bearish => "BEARISH",
            Bias::Neutral => "NEUTRAL",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Bias::Bullish => Bias::Bearish,
            Bias::Bearish => Bias::Bullish,
            Bias::Neutral => Bias::Neutral,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Bias::Neutral)
    }
}

/// Harmonic / structural pattern read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternResult {
    pub label: String,
    /// 0 to 99.9.
    pub confidence: f64,
    pub bias: Bias,
}

impl PatternResult {
    pub const CALIBRATING: &'static str = "CALIBRATING...";

    pub fn placeholder() -> Self {
        Self {
            label: Self::CALIBRATING.to_string(),
            confidence: 0.0,
            bias: Bias::Neutral,
        }
    }
}

/// Elliott wave degree, derived from the price range relative to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaveDegree {
    #[default]
    Minute,
    Minor,
    Intermediate,
    Primary,
}

impl WaveDegree {
    pub fn label(&self) -> &'static str {
        match self {
            WaveDegree::Minute => "MINUTE",
            WaveDegree::Minor => "MINOR",
            WaveDegree::Intermediate => "INTERMEDIATE",
            WaveDegree::Primary => "PRIMARY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WaveProjection {
    pub target: f64,
    /// 0 to 99.
    pub confidence: f64,
}

/// Elliott wave count and the Fibonacci relationships that support it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveAnalysis {
    pub wave_count: String,
    pub degree: WaveDegree,
    pub wave_personality: Vec<String>,
    pub fibonacci_relationships: Vec<String>,
    pub projection: WaveProjection,
    pub alternation: bool,
    pub equality: bool,
}

impl WaveAnalysis {
    pub const INSUFFICIENT: &'static str = "INSUFFICIENT DATA";

    pub fn placeholder() -> Self {
        Self {
            wave_count: Self::INSUFFICIENT.to_string(),
            degree: WaveDegree::Minute,
            wave_personality: Vec::new(),
            fibonacci_relationships: Vec::new(),
            projection: WaveProjection::default(),
            alternation: false,
            equality: false,
        }
    }
}

/// Abnormal price behaviour read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManipulationResult {
    pub detected: bool,
    #[serde(rename = "type")]
    pub manipulation_type: String,
    /// Unbounded accumulator.
    pub severity: u32,
    pub indicators: Vec<String>,
    /// 0 to 100+ accumulator.
    pub institutional_footprint: f64,
}

impl ManipulationResult {
    pub const ORGANIC: &'static str = "ORGANIC FLOW";
    pub const INSUFFICIENT: &'static str = "INSUFFICIENT DATA";

    pub fn placeholder() -> Self {
        Self {
            detected: false,
            manipulation_type: Self::INSUFFICIENT.to_string(),
            severity: 0,
            indicators: Vec::new(),
            institutional_footprint: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpikeSeverity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
    Extreme,
}

impl SpikeSeverity {
    /// Severity band for an accumulated spike probability.
    pub fn from_probability(probability: f64) -> Self {
        if probability > 90.0 {
            SpikeSeverity::Extreme
        } else if probability > 75.0 {
            SpikeSeverity::Critical
        } else if probability > 55.0 {
            SpikeSeverity::High
        } else if probability > 35.0 {
            SpikeSeverity::Medium
        } else {
            SpikeSeverity::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpikeDirection {
    Up,
    Down,
    #[default]
    Neutral,
}

impl SpikeDirection {
    pub fn bias(&self) -> Bias {
        match self {
            SpikeDirection::Up => Bias::Bullish,
            SpikeDirection::Down => Bias::Bearish,
            SpikeDirection::Neutral => Bias::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpikePrediction {
    #[default]
    Stable,
    Building,
    Imminent,
}

/// Spike / anomaly read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeResult {
    pub is_spike: bool,
    pub severity: SpikeSeverity,
    pub direction: SpikeDirection,
    /// 0 to 99.9.
    pub probability: f64,
    pub indicators: Vec<String>,
    pub prediction: SpikePrediction,
    /// Estimated bars until the spike, set by the snap check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_spike: Option<u32>,
}

impl SpikeResult {
    pub fn placeholder() -> Self {
        Self {
            is_spike: false,
            severity: SpikeSeverity::Low,
            direction: SpikeDirection::Neutral,
            probability: 0.0,
            indicators: Vec::new(),
            prediction: SpikePrediction::Stable,
            time_to_spike: None,
        }
    }
}

// =============================================================================
// Technical suite
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: Bias,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
    /// %B: 0 at the lower band, 1 at the upper band.
    pub percent_b: f64,
    pub squeeze: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaAlignment {
    Golden,
    Death,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MovingAverages {
    pub ma20: f64,
    pub ma50: f64,
    pub ma200: f64,
    pub alignment: MaAlignment,
}

/// Classic floor-trader pivot levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PivotLevels {
    pub pivot: f64,
    pub resistance1: f64,
    pub resistance2: f64,
    pub support1: f64,
    pub support2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StochasticCross {
    Bullish,
    Bearish,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
    pub cross: StochasticCross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityState {
    Expanding,
    Contracting,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AtrReading {
    pub atr: f64,
    pub previous: f64,
    pub state: VolatilityState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    /// ADX above 25.
    pub strong: bool,
}

impl AdxReading {
    /// Direction of a strong trend, neutral when the trend is weak.
    pub fn directional_bias(&self) -> Bias {
        if !self.strong {
            Bias::Neutral
        } else if self.plus_di > self.minus_di {
            Bias::Bullish
        } else if self.minus_di > self.plus_di {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudPosition {
    AboveCloud,
    BelowCloud,
    #[default]
    InCloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuReading {
    pub conversion: f64,
    pub base: f64,
    pub span_a: f64,
    pub span_b: f64,
    pub position: CloudPosition,
    pub signal: Bias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciReading {
    pub high: f64,
    pub low: f64,
    /// (ratio, price) pairs for 23.6/38.2/50/61.8/78.6%.
    pub levels: Vec<(f64, f64)>,
    /// Ratio of the level price currently sits on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest: Option<f64>,
}

/// Output of the multi-indicator technical suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAnalysis {
    pub rsi: f64,
    pub macd: MacdReading,
    pub bollinger: BollingerReading,
    pub moving_averages: MovingAverages,
    pub pivots: PivotLevels,
    pub divergence: Bias,
    pub stochastic: StochasticReading,
    pub atr: AtrReading,
    pub adx: AdxReading,
    pub ichimoku: IchimokuReading,
    pub fibonacci: FibonacciReading,
    /// Signed accumulator, no fixed cap.
    pub confluence: f64,
    /// 0 to 100.
    pub overall_strength: f64,
    /// First 8 signal strings only.
    pub signals: Vec<String>,
}

impl TechnicalAnalysis {
    /// All-neutral defaults used below the minimum history length.
    pub fn neutral() -> Self {
        Self {
            rsi: 50.0,
            macd: MacdReading::default(),
            bollinger: BollingerReading {
                percent_b: 0.5,
                ..Default::default()
            },
            moving_averages: MovingAverages::default(),
            pivots: PivotLevels::default(),
            divergence: Bias::Neutral,
            stochastic: StochasticReading {
                k: 50.0,
                d: 50.0,
                cross: StochasticCross::None,
            },
            atr: AtrReading::default(),
            adx: AdxReading::default(),
            ichimoku: IchimokuReading::default(),
            fibonacci: FibonacciReading::default(),
            confluence: 0.0,
            overall_strength: 50.0,
            signals: Vec::new(),
        }
    }
}

/// Every engine component evaluated against one history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub symbol: String,
    pub price: f64,
    pub bars: usize,
    pub volatility: f64,
    pub technical_strength: u8,
    pub pattern: PatternResult,
    pub waves: WaveAnalysis,
    pub manipulation: ManipulationResult,
    pub smc: SmcResult,
    pub spike: SpikeResult,
    pub technical: TechnicalAnalysis,
    /// Unix timestamp (milliseconds) of the clock reading used.
    pub timestamp: i64,
}
