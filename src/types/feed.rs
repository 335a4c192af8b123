use serde::{Deserialize, Serialize};

/// Lifecycle of the broker tick-feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Authorizing,
    Live,
    /// Waiting `delay_ms` before reconnect attempt `attempt`.
    Reconnecting { attempt: u32, delay_ms: u64 },
    Failed,
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authorizing => "authorizing",
            Self::Live => "live",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Failed => "failed",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
