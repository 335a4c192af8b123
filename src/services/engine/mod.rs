//! Market-heuristics engine.
//!
//! Every component is a pure function of a price history (oldest first).
//! Components read the same buffer independently; short histories produce
//! each component's placeholder record rather than an error.

pub mod elliott;
pub mod ict;
pub mod manipulation;
pub mod patterns;
pub mod rules;
pub mod smc;
pub mod spike;
pub mod stats;
pub mod strength;
pub mod technical;
pub mod volatility;

use chrono::{DateTime, Utc};

use crate::types::MarketReport;
use patterns::PatternContext;

/// Synthetic indices with one-sided spike behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticIndex {
    /// Drifts down, spikes up.
    Boom,
    /// Drifts up, spikes down.
    Crash,
}

impl SyntheticIndex {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let upper = symbol.to_uppercase();
        if upper.contains("BOOM") {
            Some(Self::Boom)
        } else if upper.contains("CRASH") {
            Some(Self::Crash)
        } else {
            None
        }
    }
}

/// Runs every component against one history.
pub struct Engine;

impl Engine {
    pub fn analyze(history: &[f64], symbol: &str, now: DateTime<Utc>) -> MarketReport {
        let waves = elliott::analyze(history);
        let smc = smc::analyze(history, symbol, now);
        let pattern = patterns::recognize(
            history,
            &PatternContext {
                waves: &waves,
                smc_trend: smc.trend,
            },
        );

        MarketReport {
            symbol: symbol.to_uppercase(),
            price: history.last().copied().unwrap_or(0.0),
            bars: history.len(),
            volatility: volatility::calculate(history),
            technical_strength: strength::calculate(history),
            pattern,
            waves,
            manipulation: manipulation::detect(history),
            smc,
            spike: spike::detect(history, symbol),
            technical: technical::analyze(history),
            timestamp: now.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_synthetic_index_from_symbol() {
        assert_eq!(SyntheticIndex::from_symbol("BOOM1000"), Some(SyntheticIndex::Boom));
        assert_eq!(SyntheticIndex::from_symbol("crash500"), Some(SyntheticIndex::Crash));
        assert_eq!(SyntheticIndex::from_symbol("R_100"), None);
    }

    #[test]
    fn test_report_for_empty_history() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let report = Engine::analyze(&[], "r_100", now);
        assert_eq!(report.symbol, "R_100");
        assert_eq!(report.bars, 0);
        assert_eq!(report.price, 0.0);
        assert_eq!(report.volatility, 0.0);
        assert_eq!(report.technical_strength, 50);
        assert_eq!(report.smc, crate::types::SmcResult::placeholder());
        assert_eq!(report.timestamp, now.timestamp_millis());
    }

    #[test]
    fn test_report_matches_components() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        let history: Vec<f64> = (0..250).map(|i| 100.0 * 1.005f64.powi(i)).collect();
        let report = Engine::analyze(&history, "R_100", now);
        assert_eq!(report.pattern, patterns::analyze(&history, "R_100", now));
        assert_eq!(report.spike, spike::detect(&history, "R_100"));
        assert_eq!(report.technical, technical::analyze(&history));
        assert_eq!(report.technical_strength, 100);
    }
}
