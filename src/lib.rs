//! Tickscope - market-heuristics engine and signal composer over rolling
//! tick histories.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{HistoryStore, SignalComposer, SignalStore, TickFeed};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub history: Arc<HistoryStore>,
    pub signal_store: Arc<SignalStore>,
    pub composer: Arc<SignalComposer>,
    pub feed: Arc<TickFeed>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let history = HistoryStore::new(config.history_capacity);
        let feed = TickFeed::new(config.feed.clone(), history.clone());
        let composer = Arc::new(SignalComposer::new(config.composer.clone()));

        Self {
            config: Arc::new(config),
            history,
            signal_store: SignalStore::new(),
            composer,
            feed,
        }
    }
}
