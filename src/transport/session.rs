use crate::transport::{BdAddr, ChannelPair, HidChannel, TransportError};
use tracing::{debug, trace};

/// Console frames never exceed this many bytes.
pub const RECV_BUFFER: usize = 50;

/// The one live control/interrupt pair of a session.
///
/// A reconnect or a fresh pairing builds a new `TransportSession`; an existing
/// one is never re-pointed at another console.
pub struct TransportSession {
    // Held open for the lifetime of the link; HID traffic uses interrupt only.
    _control: Box<dyn HidChannel>,
    interrupt: Box<dyn HidChannel>,
    console: BdAddr,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("console", &self.console)
            .finish_non_exhaustive()
    }
}

impl TransportSession {
    /// Takes ownership of a channel pair. The console address is the
    /// interrupt channel's peer.
    pub fn new(pair: ChannelPair) -> Result<Self, TransportError> {
        let console = pair
            .interrupt
            .peer_address()
            .map_err(|source| TransportError::Fault {
                channel: "interrupt",
                source,
            })?;
        debug!("Transport established with console {}", console);

        Ok(Self {
            _control: pair.control,
            interrupt: pair.interrupt,
            console,
        })
    }

    pub fn console_address(&self) -> BdAddr {
        self.console
    }

    pub fn set_nonblocking(&mut self) -> Result<(), TransportError> {
        self.interrupt
            .set_nonblocking()
            .map_err(|source| TransportError::Fault {
                channel: "interrupt",
                source,
            })
    }

    /// `Ok(None)` when nothing is waiting.
    pub fn recv_reply(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = [0u8; RECV_BUFFER];
        match self.interrupt.recv(&mut buf) {
            Ok(0) => Err(TransportError::Fault {
                channel: "interrupt",
                source: std::io::ErrorKind::UnexpectedEof.into(),
            }),
            Ok(len) => {
                trace!("Received {} bytes from console", len);
                Ok(Some(buf[..len].to_vec()))
            }
            Err(err) => match TransportError::classify("interrupt", err) {
                TransportError::WouldBlock => Ok(None),
                fault => Err(fault),
            },
        }
    }

    /// Would-block is returned as [`TransportError::WouldBlock`] so callers
    /// decide whether it matters.
    pub fn send_report(&mut self, report: &[u8]) -> Result<(), TransportError> {
        self.interrupt
            .send(report)
            .map(|_| ())
            .map_err(|err| TransportError::classify("interrupt", err))
    }
}
