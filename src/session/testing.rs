//! Scripted stand-ins for the adapter and the radio.

use crate::bluetooth::{AdapterError, BluetoothAdapter};
use crate::controller::ControllerIdentity;
use crate::session::SessionSettings;
use crate::transport::{
    BdAddr, ChannelPair, Connector, HidChannel, PairingListener, TransportError, CONTROL_PSM,
};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CONSOLE: BdAddr = BdAddr::new([0x7C, 0xBB, 0x8A, 0x01, 0x02, 0x03]);
pub const ADAPTER: BdAddr = BdAddr::new([0xDC, 0xA6, 0x32, 0x00, 0x00, 0x01]);

pub type Shared<T> = Arc<Mutex<T>>;

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        pairing_interval: Duration::from_millis(1),
        reconnect_delay: Duration::from_millis(1),
        max_reconnect_attempts: 2,
    }
}

/// Rumble plus "set player lights", the frame that completes pairing.
pub fn player_lights_frame() -> Vec<u8> {
    let mut frame = vec![0u8; 49];
    frame[0] = 0xA2;
    frame[1] = 0x01;
    frame[11] = 0x30;
    frame[12] = 0x01;
    frame
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    WouldBlock,
    Reset,
}

#[derive(Debug, Default)]
pub struct ChannelLog {
    pub sent: Vec<Vec<u8>>,
    pub send_attempts: usize,
    pub nonblocking: bool,
}

pub struct MockChannel {
    sends: VecDeque<Step>,
    then: Step,
    // `None` scripts a would-block receive.
    replies: VecDeque<Option<Vec<u8>>>,
    log: Shared<ChannelLog>,
}

impl MockChannel {
    /// A channel pair whose interrupt channel follows the script. The control
    /// channel is never written.
    pub fn interrupt(
        sends: Vec<Step>,
        then: Step,
        replies: Vec<Option<Vec<u8>>>,
    ) -> (ChannelPair, Shared<ChannelLog>) {
        let log: Shared<ChannelLog> = Arc::default();
        let interrupt = MockChannel {
            sends: sends.into(),
            then,
            replies: replies.into(),
            log: log.clone(),
        };
        let control = MockChannel {
            sends: VecDeque::new(),
            then: Step::Ok,
            replies: VecDeque::new(),
            log: Arc::default(),
        };
        let pair = ChannelPair {
            control: Box::new(control),
            interrupt: Box::new(interrupt),
        };
        (pair, log)
    }
}

impl HidChannel for MockChannel {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut log = self.log.lock().unwrap();
        log.send_attempts += 1;
        match self.sends.pop_front().unwrap_or(self.then) {
            Step::Ok => {
                log.sent.push(data.to_vec());
                Ok(data.len())
            }
            Step::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
            Step::Reset => Err(io::ErrorKind::ConnectionReset.into()),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.replies.pop_front().flatten() {
            Some(reply) => {
                let len = reply.len().min(buf.len());
                buf[..len].copy_from_slice(&reply[..len]);
                Ok(len)
            }
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn set_nonblocking(&mut self) -> io::Result<()> {
        self.log.lock().unwrap().nonblocking = true;
        Ok(())
    }

    fn peer_address(&self) -> io::Result<BdAddr> {
        Ok(CONSOLE)
    }
}

struct MockListener {
    pair: Option<ChannelPair>,
}

impl PairingListener for MockListener {
    fn accept(&mut self) -> Result<ChannelPair, TransportError> {
        self.pair.take().ok_or(TransportError::Accept {
            psm: CONTROL_PSM,
            source: io::ErrorKind::NotConnected.into(),
        })
    }
}

#[derive(Debug, Default)]
pub struct ConnectorLog {
    pub listens: usize,
    pub connects: Vec<BdAddr>,
}

pub struct MockConnector {
    accepts: VecDeque<ChannelPair>,
    // `None` scripts a refused connection.
    connects: VecDeque<Option<ChannelPair>>,
    log: Shared<ConnectorLog>,
}

impl MockConnector {
    /// Listening fails once `accepts` runs out, connecting once `connects`
    /// runs out.
    pub fn new(
        accepts: Vec<ChannelPair>,
        connects: Vec<Option<ChannelPair>>,
    ) -> (Self, Shared<ConnectorLog>) {
        let log: Shared<ConnectorLog> = Arc::default();
        let connector = Self {
            accepts: accepts.into(),
            connects: connects.into(),
            log: log.clone(),
        };
        (connector, log)
    }
}

impl Connector for MockConnector {
    fn listen(&mut self, _local: BdAddr) -> Result<Box<dyn PairingListener>, TransportError> {
        self.log.lock().unwrap().listens += 1;
        match self.accepts.pop_front() {
            Some(pair) => Ok(Box::new(MockListener { pair: Some(pair) })),
            None => Err(TransportError::Listen {
                psm: CONTROL_PSM,
                source: io::ErrorKind::AddrInUse.into(),
            }),
        }
    }

    fn connect(&mut self, remote: BdAddr) -> Result<ChannelPair, TransportError> {
        self.log.lock().unwrap().connects.push(remote);
        self.connects
            .pop_front()
            .flatten()
            .ok_or(TransportError::Connect {
                address: remote,
                psm: CONTROL_PSM,
                source: io::ErrorKind::ConnectionRefused.into(),
            })
    }
}

#[derive(Debug, Default)]
pub struct AdapterLog {
    pub setups: usize,
    pub discoverable: Vec<bool>,
}

pub struct MockAdapter {
    fail_setup: bool,
    log: Shared<AdapterLog>,
}

impl MockAdapter {
    pub fn new() -> (Self, Shared<AdapterLog>) {
        let log: Shared<AdapterLog> = Arc::default();
        let adapter = Self {
            fail_setup: false,
            log: log.clone(),
        };
        (adapter, log)
    }

    pub fn failing() -> (Self, Shared<AdapterLog>) {
        let (mut adapter, log) = Self::new();
        adapter.fail_setup = true;
        (adapter, log)
    }
}

impl BluetoothAdapter for MockAdapter {
    fn address(&self) -> BdAddr {
        ADAPTER
    }

    fn setup(&mut self, _identity: &ControllerIdentity) -> Result<(), AdapterError> {
        self.log.lock().unwrap().setups += 1;
        if self.fail_setup {
            return Err(AdapterError::Unavailable("no adapter".into()));
        }
        Ok(())
    }

    fn set_discoverable(&mut self, discoverable: bool) -> Result<(), AdapterError> {
        self.log.lock().unwrap().discoverable.push(discoverable);
        Ok(())
    }
}
