use crate::bluetooth::AdapterError;
use crate::session::state::ConnectionState;
use crate::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Bluetooth adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No active link while {0}")]
    MissingLink(ConnectionState),

    #[error("No pairing listener while pairing")]
    MissingListener,

    #[error("Reconnecting without a console address")]
    MissingTarget,
}
