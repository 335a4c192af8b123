//! Latest composed signal per symbol.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::services::composer::SignalComposer;
use crate::services::history::HistoryStore;
use crate::types::TradeSignal;

/// Holds the most recent signal for each symbol. A pass that composes no
/// signal for a symbol clears its previous one.
pub struct SignalStore {
    signals: DashMap<String, TradeSignal>,
}

impl SignalStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: DashMap::new(),
        })
    }

    pub fn get(&self, symbol: &str) -> Option<TradeSignal> {
        self.signals.get(&symbol.to_uppercase()).map(|s| s.clone())
    }

    /// All stored signals, highest confidence first.
    pub fn all(&self) -> Vec<TradeSignal> {
        let mut signals: Vec<TradeSignal> = self.signals.iter().map(|e| e.value().clone()).collect();
        signals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        signals
    }

    pub fn insert(&self, signal: TradeSignal) {
        self.signals.insert(signal.symbol.clone(), signal);
    }

    pub fn remove(&self, symbol: &str) -> Option<TradeSignal> {
        self.signals.remove(&symbol.to_uppercase()).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Compose every tracked symbol. Returns the number of live signals.
    pub fn refresh(&self, composer: &SignalComposer, history: &HistoryStore, now: DateTime<Utc>) -> usize {
        for symbol in history.symbols() {
            match composer.compose(&symbol, &history.snapshot(&symbol), now) {
                Some(signal) => self.insert(signal),
                None => {
                    if self.remove(&symbol).is_some() {
                        debug!("{}: signal expired", symbol);
                    }
                }
            }
        }
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeDirection;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn signal(symbol: &str, confidence: f64) -> TradeSignal {
        TradeSignal {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            direction: TradeDirection::Buy,
            confidence,
            entry: 100.0,
            take_profit: 106.0,
            stop_loss: 98.0,
            risk_reward: 3.0,
            timeframes: Vec::new(),
            reasons: Vec::new(),
            pattern: "STRUCTURAL BIAS".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_insert_get_and_order() {
        let store = SignalStore::new();
        store.insert(signal("R_10", 72.0));
        store.insert(signal("R_100", 91.0));
        assert_eq!(store.get("r_10").map(|s| s.confidence), Some(72.0));
        let all = store.all();
        assert_eq!(all[0].symbol, "R_100");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_refresh_clears_stale_signals() {
        let store = SignalStore::new();
        store.insert(signal("FLAT", 80.0));
        let history = HistoryStore::new(200);
        history.seed("flat", &vec![100.0; 200]).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap();
        assert_eq!(store.refresh(&SignalComposer::default(), &history, now), 0);
        assert!(store.get("FLAT").is_none());
    }
}
