use serde::Serialize;
use std::fmt;

/// Externally visible connection state of a session.
///
/// Mirrors the phases of [`ControllerSession`](super::ControllerSession) plus
/// the terminal `Crashed`, which has no typestate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Connecting,
    Pairing,
    Connected,
    Reconnecting,
    Crashed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Initializing => "initializing",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Pairing => "pairing",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Crashed => "crashed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Crashed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
