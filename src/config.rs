use std::env;

/// Signal composer configuration.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Interval between composer passes over all tracked symbols (ms).
    pub interval_ms: u64,
    /// Signals below this confidence (percent) are discarded.
    pub min_confidence: f64,
    /// Symbols with fewer prices than this are skipped.
    pub min_history: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            min_confidence: 70.0,
            min_history: 180,
        }
    }
}

/// Tick-feed reconnect policy.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Delay before the first reconnect attempt (ms). Doubles per attempt.
    pub reconnect_base_ms: u64,
    /// Upper bound on the reconnect delay (ms).
    pub reconnect_max_ms: u64,
    /// Attempts before the feed gives up.
    pub max_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_base_ms: 1000,
            reconnect_max_ms: 30_000,
            max_attempts: 10,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Prices kept per symbol.
    pub history_capacity: usize,
    pub composer: ComposerConfig,
    pub feed: FeedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            history_capacity: 200,
            composer: ComposerConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            history_capacity: parsed("HISTORY_CAPACITY", defaults.history_capacity),
            composer: ComposerConfig {
                interval_ms: parsed("COMPOSER_INTERVAL_MS", defaults.composer.interval_ms),
                min_confidence: parsed("MIN_SIGNAL_CONFIDENCE", defaults.composer.min_confidence),
                min_history: parsed("COMPOSER_MIN_HISTORY", defaults.composer.min_history),
            },
            feed: FeedConfig {
                reconnect_base_ms: parsed("FEED_RECONNECT_BASE_MS", defaults.feed.reconnect_base_ms),
                reconnect_max_ms: parsed("FEED_RECONNECT_MAX_MS", defaults.feed.reconnect_max_ms),
                max_attempts: parsed("FEED_MAX_ATTEMPTS", defaults.feed.max_attempts),
            },
        }
    }
}
