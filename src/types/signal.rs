use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::Bias;

/// Synthetic timeframe, realised as a trailing slice of one price buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    M5,
    M15,
    H1,
    H4,
}

impl Timeframe {
    /// All timeframes, shortest first.
    pub const ALL: [Timeframe; 4] = [Timeframe::M5, Timeframe::M15, Timeframe::H1, Timeframe::H4];

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "m5" | "5m" => Some(Self::M5),
            "m15" | "15m" => Some(Self::M15),
            "h1" | "1h" => Some(Self::H1),
            "h4" | "4h" => Some(Self::H4),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::H1 => "H1",
            Self::H4 => "H4",
        }
    }

    /// Number of trailing bars in the slice. `None` means the whole history.
    pub fn window(&self) -> Option<usize> {
        match self {
            Self::M5 => Some(30),
            Self::M15 => Some(60),
            Self::H1 => Some(240),
            Self::H4 => None,
        }
    }

    /// Vote weight; longer timeframes count more.
    pub fn weight(&self) -> f64 {
        match self {
            Self::M5 => 1.0,
            Self::M15 => 1.5,
            Self::H1 => 2.0,
            Self::H4 => 3.0,
        }
    }

    /// The trailing slice of `history` this timeframe reads.
    pub fn slice<'a>(&self, history: &'a [f64]) -> &'a [f64] {
        match self.window() {
            Some(n) if n < history.len() => &history[history.len() - n..],
            _ => history,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn bias(&self) -> Bias {
        match self {
            TradeDirection::Buy => Bias::Bullish,
            TradeDirection::Sell => Bias::Bearish,
        }
    }

    pub fn sign(&self) -> f64 {
        self.bias().sign()
    }
}

/// Weighted votes cast within one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeBias {
    pub timeframe: Timeframe,
    pub bullish_votes: f64,
    pub bearish_votes: f64,
    pub bias: Bias,
}

/// Final directional call for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSignal {
    pub id: Uuid,
    pub symbol: String,
    pub direction: TradeDirection,
    /// Percentage, 70 to 99.
    pub confidence: f64,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub risk_reward: f64,
    pub timeframes: Vec<TimeframeBias>,
    pub reasons: Vec<String>,
    pub pattern: String,
    /// Unix timestamp (milliseconds).
    pub timestamp: i64,
}
