//! Bluetooth HID transport.
//!
//! A HID device talks over two L2CAP channels: control on PSM 17 and
//! interrupt on PSM 19. Reports flow over the interrupt channel, which is
//! switched to non-blocking mode as soon as a session is established.
//!
//! - [`address`] - Bluetooth device addresses
//! - [`l2cap`] - Linux L2CAP `SOCK_SEQPACKET` sockets
//! - [`session`] - [`TransportSession`], one live control/interrupt pair
//!
//! The session loop only sees the [`Connector`], [`PairingListener`] and
//! [`HidChannel`] traits, so tests can drive it without a radio.

pub mod address;
pub mod l2cap;
pub mod session;

pub use address::{AddressError, BdAddr};
pub use l2cap::L2capConnector;
pub use session::TransportSession;

use std::io;
use thiserror::Error;

pub const CONTROL_PSM: u16 = 17;
pub const INTERRUPT_PSM: u16 = 19;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The non-blocking channel is momentarily unwritable or empty.
    #[error("Channel would block")]
    WouldBlock,

    #[error("Transport fault on {channel} channel: {source}")]
    Fault {
        channel: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open L2CAP socket: {0}")]
    Socket(#[source] io::Error),

    #[error("Failed to bind {address} on PSM {psm}: {source}")]
    Bind {
        address: BdAddr,
        psm: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to listen on PSM {psm}: {source}")]
    Listen {
        psm: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept on PSM {psm}: {source}")]
    Accept {
        psm: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to {address} on PSM {psm}: {source}")]
    Connect {
        address: BdAddr,
        psm: u16,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Sorts an I/O error from a live channel into would-block or fault.
    pub fn classify(channel: &'static str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => TransportError::WouldBlock,
            _ => TransportError::Fault { channel, source },
        }
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, TransportError::WouldBlock)
    }
}

/// One connected, message oriented HID channel.
pub trait HidChannel: Send {
    fn send(&mut self, data: &[u8]) -> io::Result<usize>;

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn set_nonblocking(&mut self) -> io::Result<()>;

    fn peer_address(&self) -> io::Result<BdAddr>;
}

/// Freshly accepted or connected control and interrupt channels.
pub struct ChannelPair {
    pub control: Box<dyn HidChannel>,
    pub interrupt: Box<dyn HidChannel>,
}

impl std::fmt::Debug for ChannelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPair").finish_non_exhaustive()
    }
}

/// Bound and listening sockets waiting for a console to pair.
pub trait PairingListener: Send {
    /// Blocks until one control and one interrupt connection are accepted.
    fn accept(&mut self) -> Result<ChannelPair, TransportError>;
}

pub trait Connector: Send {
    /// Binds both PSMs on `local`, falling back to the wildcard address, and
    /// starts listening.
    fn listen(&mut self, local: BdAddr) -> Result<Box<dyn PairingListener>, TransportError>;

    /// Connects both PSMs to a previously paired console.
    fn connect(&mut self, remote: BdAddr) -> Result<ChannelPair, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_is_not_a_fault() {
        let err = TransportError::classify("interrupt", io::ErrorKind::WouldBlock.into());
        assert!(err.is_would_block());

        let err = TransportError::classify("interrupt", io::ErrorKind::ConnectionReset.into());
        assert!(matches!(
            err,
            TransportError::Fault {
                channel: "interrupt",
                ..
            }
        ));
    }
}
