//! Rolling per-symbol price buffers.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum HistoryError {
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
}

/// Price histories keyed by uppercase symbol, oldest first. Each buffer
/// keeps at most `capacity` prices and drops the oldest on overflow.
pub struct HistoryStore {
    data: DashMap<String, VecDeque<f64>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            data: DashMap::new(),
            capacity: capacity.max(1),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a price. Returns the buffer length afterwards.
    pub fn push(&self, symbol: &str, price: f64) -> Result<usize, HistoryError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(HistoryError::InvalidPrice(price));
        }

        let mut entry = self.data.entry(symbol.to_uppercase()).or_default();
        let buffer = entry.value_mut();
        buffer.push_back(price);
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
        Ok(buffer.len())
    }

    /// Replace a symbol's buffer with `prices`, keeping the newest `capacity`.
    pub fn seed(&self, symbol: &str, prices: &[f64]) -> Result<usize, HistoryError> {
        if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
            return Err(HistoryError::InvalidPrice(*bad));
        }

        let start = prices.len().saturating_sub(self.capacity);
        let buffer: VecDeque<f64> = prices[start..].iter().copied().collect();
        let len = buffer.len();
        debug!("Seeded {} prices for {}", len, symbol.to_uppercase());
        self.data.insert(symbol.to_uppercase(), buffer);
        Ok(len)
    }

    /// Copy of the current buffer; empty for unknown symbols.
    pub fn snapshot(&self, symbol: &str) -> Vec<f64> {
        self.data
            .get(&symbol.to_uppercase())
            .map(|buffer| buffer.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.data.get(&symbol.to_uppercase()).map_or(0, |buffer| buffer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Tracked symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn clear(&self, symbol: &str) -> bool {
        self.data.remove(&symbol.to_uppercase()).is_some()
    }
}
