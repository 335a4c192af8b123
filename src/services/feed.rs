//! Tick-feed connection lifecycle.
//!
//! No transport lives here: the state machine only tracks where a broker
//! connection is and gates which ticks reach the history store.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::services::history::{HistoryError, HistoryStore};
use crate::types::ConnectionState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: ConnectionState,
        action: &'static str,
    },

    #[error("Feed gave up after {attempts} reconnect attempts")]
    GaveUp { attempts: u32 },

    #[error("Feed is {state}, ticks need a live feed")]
    NotLive { state: ConnectionState },
}

/// Lifecycle events a transport (or an operator) reports to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAction {
    Connect,
    Open,
    Authorize,
    Drop,
    Retry,
    Disconnect,
}

impl FeedAction {
    pub const ALL: [FeedAction; 6] = [
        FeedAction::Connect,
        FeedAction::Open,
        FeedAction::Authorize,
        FeedAction::Drop,
        FeedAction::Retry,
        FeedAction::Disconnect,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeedAction::Connect => "connect",
            FeedAction::Open => "open",
            FeedAction::Authorize => "authorize",
            FeedAction::Drop => "drop",
            FeedAction::Retry => "retry",
            FeedAction::Disconnect => "disconnect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(name))
    }
}

/// Explicit connection state machine with exponential reconnect backoff.
///
/// ```text
/// Disconnected -connect-> Connecting -opened-> Authorizing -authorized-> Live
/// Connecting/Authorizing/Live -dropped-> Reconnecting -retry-> Connecting
/// Reconnecting (attempts exhausted) -> Failed
/// any -disconnect-> Disconnected
/// ```
#[derive(Debug)]
pub struct FeedConnection {
    state: ConnectionState,
    attempts: u32,
    config: FeedConfig,
}

impl FeedConnection {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts since the last successful authorization.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn invalid(&self, action: &'static str) -> FeedError {
        FeedError::InvalidTransition {
            state: self.state,
            action,
        }
    }

    fn transition(&mut self, next: ConnectionState) -> ConnectionState {
        info!("Feed {} -> {}", self.state, next);
        self.state = next;
        next
    }

    /// Delay before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .config
            .reconnect_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.config.reconnect_max_ms);
        Duration::from_millis(delay)
    }

    pub fn connect(&mut self) -> Result<ConnectionState, FeedError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed => {
                self.attempts = 0;
                Ok(self.transition(ConnectionState::Connecting))
            }
            _ => Err(self.invalid("connect")),
        }
    }

    /// Socket opened; authorization pending.
    pub fn opened(&mut self) -> Result<ConnectionState, FeedError> {
        match self.state {
            ConnectionState::Connecting => Ok(self.transition(ConnectionState::Authorizing)),
            _ => Err(self.invalid("open")),
        }
    }

    pub fn authorized(&mut self) -> Result<ConnectionState, FeedError> {
        match self.state {
            ConnectionState::Authorizing => {
                self.attempts = 0;
                Ok(self.transition(ConnectionState::Live))
            }
            _ => Err(self.invalid("authorize")),
        }
    }

    /// Connection lost. Schedules the next attempt, or fails once the
    /// attempt budget is spent.
    pub fn dropped(&mut self) -> Result<ConnectionState, FeedError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Authorizing | ConnectionState::Live => {
                let attempt = self.attempts + 1;
                if attempt > self.config.max_attempts {
                    warn!("Feed giving up after {} attempts", self.attempts);
                    self.transition(ConnectionState::Failed);
                    return Err(FeedError::GaveUp {
                        attempts: self.attempts,
                    });
                }
                self.attempts = attempt;
                let delay_ms = self.backoff(attempt).as_millis() as u64;
                Ok(self.transition(ConnectionState::Reconnecting { attempt, delay_ms }))
            }
            _ => Err(self.invalid("drop")),
        }
    }

    /// Backoff elapsed; start the scheduled attempt.
    pub fn retry(&mut self) -> Result<ConnectionState, FeedError> {
        match self.state {
            ConnectionState::Reconnecting { .. } => Ok(self.transition(ConnectionState::Connecting)),
            _ => Err(self.invalid("retry")),
        }
    }

    pub fn disconnect(&mut self) -> ConnectionState {
        self.attempts = 0;
        self.transition(ConnectionState::Disconnected)
    }

    pub fn apply(&mut self, action: FeedAction) -> Result<ConnectionState, FeedError> {
        match action {
            FeedAction::Connect => self.connect(),
            FeedAction::Open => self.opened(),
            FeedAction::Authorize => self.authorized(),
            FeedAction::Drop => self.dropped(),
            FeedAction::Retry => self.retry(),
            FeedAction::Disconnect => Ok(self.disconnect()),
        }
    }
}

/// Feed connection paired with the store it feeds.
pub struct TickFeed {
    connection: RwLock<FeedConnection>,
    history: Arc<HistoryStore>,
}

impl TickFeed {
    pub fn new(config: FeedConfig, history: Arc<HistoryStore>) -> Arc<Self> {
        Arc::new(Self {
            connection: RwLock::new(FeedConnection::new(config)),
            history,
        })
    }

    pub async fn state(&self) -> ConnectionState {
        self.connection.read().await.state()
    }

    /// Apply one lifecycle event under the write lock.
    pub async fn apply(&self, action: FeedAction) -> Result<ConnectionState, FeedError> {
        self.connection.write().await.apply(action)
    }

    /// Accept a tick into the history. Only a live feed accepts ticks.
    pub async fn ingest(&self, symbol: &str, price: f64) -> Result<usize, IngestError> {
        let state = self.state().await;
        if !state.is_live() {
            return Err(IngestError::Feed(FeedError::NotLive { state }));
        }
        Ok(self.history.push(symbol, price)?)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> FeedConfig {
        FeedConfig {
            reconnect_base_ms: 100,
            reconnect_max_ms: 1000,
            max_attempts,
        }
    }

    fn live(max_attempts: u32) -> FeedConnection {
        let mut connection = FeedConnection::new(config(max_attempts));
        connection.connect().unwrap();
        connection.opened().unwrap();
        connection.authorized().unwrap();
        connection
    }

    #[test]
    fn test_happy_path() {
        let connection = live(3);
        assert_eq!(connection.state(), ConnectionState::Live);
        assert_eq!(connection.attempts(), 0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let connection = FeedConnection::new(config(10));
        assert_eq!(connection.backoff(1), Duration::from_millis(100));
        assert_eq!(connection.backoff(2), Duration::from_millis(200));
        assert_eq!(connection.backoff(4), Duration::from_millis(800));
        assert_eq!(connection.backoff(5), Duration::from_millis(1000));
        assert_eq!(connection.backoff(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_drop_schedules_reconnect() {
        let mut connection = live(3);
        let state = connection.dropped().unwrap();
        assert_eq!(
            state,
            ConnectionState::Reconnecting {
                attempt: 1,
                delay_ms: 100
            }
        );
        assert_eq!(connection.retry().unwrap(), ConnectionState::Connecting);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut connection = live(2);
        connection.dropped().unwrap();
        connection.retry().unwrap();
        connection.dropped().unwrap();
        connection.retry().unwrap();
        assert_eq!(connection.dropped(), Err(FeedError::GaveUp { attempts: 2 }));
        assert_eq!(connection.state(), ConnectionState::Failed);

        // Failed can start over.
        assert_eq!(connection.connect().unwrap(), ConnectionState::Connecting);
    }

    #[test]
    fn test_authorization_resets_attempts() {
        let mut connection = live(5);
        connection.dropped().unwrap();
        connection.retry().unwrap();
        connection.opened().unwrap();
        connection.authorized().unwrap();
        assert_eq!(connection.attempts(), 0);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut connection = FeedConnection::new(config(3));
        assert!(matches!(
            connection.opened(),
            Err(FeedError::InvalidTransition { action: "open", .. })
        ));
        assert!(connection.dropped().is_err());
        assert!(connection.retry().is_err());
        connection.connect().unwrap();
        assert!(connection.connect().is_err());
        assert_eq!(connection.disconnect(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_apply_drives_the_machine() {
        let mut connection = FeedConnection::new(config(1));
        assert_eq!(connection.apply(FeedAction::Connect).unwrap(), ConnectionState::Connecting);
        assert_eq!(connection.apply(FeedAction::Open).unwrap(), ConnectionState::Authorizing);
        assert!(matches!(
            connection.apply(FeedAction::Retry),
            Err(FeedError::InvalidTransition { action: "retry", .. })
        ));
        assert_eq!(connection.apply(FeedAction::Authorize).unwrap(), ConnectionState::Live);
        assert!(matches!(
            connection.apply(FeedAction::Drop).unwrap(),
            ConnectionState::Reconnecting { attempt: 1, .. }
        ));
        assert_eq!(connection.apply(FeedAction::Disconnect).unwrap(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(FeedAction::from_name("authorize"), Some(FeedAction::Authorize));
        assert_eq!(FeedAction::from_name("DROP"), Some(FeedAction::Drop));
        assert_eq!(FeedAction::from_name("ticks"), None);
        for action in FeedAction::ALL {
            assert_eq!(FeedAction::from_name(action.name()), Some(action));
        }
    }

    #[tokio::test]
    async fn test_ingest_only_when_live() {
        let history = HistoryStore::new(10);
        let feed = TickFeed::new(config(3), history.clone());
        assert_eq!(
            feed.ingest("R_100", 1.0).await,
            Err(IngestError::Feed(FeedError::NotLive {
                state: ConnectionState::Disconnected
            }))
        );

        for action in [FeedAction::Connect, FeedAction::Open, FeedAction::Authorize] {
            feed.apply(action).await.unwrap();
        }

        assert_eq!(feed.ingest("R_100", 1.0).await, Ok(1));
        assert!(matches!(feed.ingest("R_100", -1.0).await, Err(IngestError::History(_))));
        assert_eq!(history.len("R_100"), 1);
    }
}
