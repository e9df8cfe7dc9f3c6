//! Controller session state machine and the loop that drives it.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──► Initializing ──► Connecting ──► Pairing ──► Connected
//!                        │               ▲                        │   ▲
//!                        │               │ (2 failed reconnects)  ▼   │
//!                        └──────────────────────────────────► Reconnecting
//!                      (known console)
//! ```
//!
//! Every arrow into Connected builds a brand new [`TransportSession`] and
//! [`ControllerProtocol`]; the previous pair is dropped, never patched.
//! Leaving the typestate (a fatal error) is reported as `Crashed`.
//!
//! # Steady State
//!
//! ```text
//! recv (non-blocking) ──► one task ──► process_commands ──► aggregator tick
//!        ▲                                                        │
//!        └────── sleep cadence ◄── send (non-blocking) ◄── get_report
//! ```

use crate::bluetooth::BluetoothAdapter;
use crate::controller::{Color, ControllerIdentity, ControllerType};
use crate::input::{InputAggregator, InputFrame};
use crate::protocol::{describe_controller_message, is_pairing_accepted, ControllerProtocol};
use crate::session::error::SessionError;
use crate::session::lock::AdapterLock;
use crate::session::recovery::{ReconnectCounter, RecoveryAction};
use crate::session::settings::SessionSettings;
use crate::session::state::ConnectionState;
use crate::session::status::StatusSink;
use crate::session::task::{TaskRequest, TaskSource};
use crate::transport::{
    BdAddr, Connector, PairingListener, TransportError, TransportSession,
};
use statum::{machine, state};
use std::convert::Infallible;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

/// Transport plus the protocol engine bound to it.
struct ActiveLink {
    transport: TransportSession,
    protocol: ControllerProtocol,
}

impl ActiveLink {
    fn new(transport: TransportSession, protocol: ControllerProtocol) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    /// Sends the report that prompts the console to start talking.
    fn prompt(&mut self) -> Result<(), TransportError> {
        self.protocol.process_commands(None);
        let report = self.protocol.get_report();
        match self.transport.send_report(&report) {
            Err(TransportError::WouldBlock) => {
                debug!("Prompt report would block, console will be polled anyway");
                Ok(())
            }
            other => other,
        }
    }
}

fn log_exchange(reply: Option<&[u8]>, report: &[u8]) {
    if reply.is_some() {
        debug!("{}", describe_controller_message(report));
    }
}

/// Collaborators a session talks to besides the radio. All optional.
#[derive(Debug, Default)]
pub struct SessionChannels {
    pub status: Option<StatusSink>,
    pub tasks: Option<mpsc::Receiver<TaskRequest>>,
    pub live_input: Option<watch::Receiver<InputFrame>>,
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Connecting,
    Pairing,
    Connected,
    Reconnecting(BdAddr),
}

#[machine]
pub struct ControllerSession<S: SessionPhase> {
    identity: ControllerIdentity,
    adapter: Box<dyn BluetoothAdapter>,
    connector: Box<dyn Connector>,
    settings: SessionSettings,
    counter: ReconnectCounter,
    aggregator: InputAggregator,
    tasks: Option<TaskSource>,
    live_input: Option<watch::Receiver<InputFrame>>,
    status: Option<StatusSink>,
    listener: Option<Box<dyn PairingListener>>,
    link: Option<ActiveLink>,
}

/// Where a session goes after losing its console.
pub enum Recovery {
    Reconnect(ControllerSession<Reconnecting>),
    Connect(ControllerSession<Connecting>),
}

pub enum ReconnectOutcome {
    Connected(ControllerSession<Connected>),
    Retry(ControllerSession<Reconnecting>),
    Exhausted(ControllerSession<Connecting>),
}

impl<S: SessionPhase> ControllerSession<S> {
    pub fn identity(&self) -> &ControllerIdentity {
        &self.identity
    }

    pub fn reconnect_counter(&self) -> ReconnectCounter {
        self.counter
    }

    fn publish(&self, state: ConnectionState) {
        info!(
            "{} session is now {}",
            self.identity.controller_type, state
        );
        if let Some(sink) = &self.status {
            sink.state(state);
        }
    }

    fn fresh_protocol(&self) -> ControllerProtocol {
        ControllerProtocol::new(self.identity.clone())
    }
}

impl ControllerSession<Uninitialized> {
    pub fn create(
        identity: ControllerIdentity,
        adapter: Box<dyn BluetoothAdapter>,
        connector: Box<dyn Connector>,
        settings: SessionSettings,
        channels: SessionChannels,
    ) -> Self {
        let counter = ReconnectCounter::new(settings.max_reconnect_attempts);
        let mut aggregator = InputAggregator::new();
        if let Some(live) = &channels.live_input {
            aggregator.set_live_input(*live.borrow());
        }

        Self::new(
            identity,
            adapter,
            connector,
            settings,
            counter,
            aggregator,
            channels.tasks.map(TaskSource::new),
            channels.live_input,
            channels.status,
            None, // listener
            None, // link
        )
    }

    pub fn start(self) -> ControllerSession<Initializing> {
        let next: ControllerSession<Initializing> = self.transition();
        next.publish(ConnectionState::Initializing);
        next
    }
}

impl ControllerSession<Initializing> {
    /// Presents the adapter as this controller. Failures here are fatal.
    pub fn setup_adapter(mut self) -> Result<Self, SessionError> {
        self.adapter.setup(&self.identity)?;
        debug!("Adapter configured for {}", self.identity.controller_type);
        Ok(self)
    }

    pub fn connect(self) -> ControllerSession<Connecting> {
        let next: ControllerSession<Connecting> = self.transition();
        next.publish(ConnectionState::Connecting);
        next
    }

    /// Skips pairing and goes straight for a console paired before.
    pub fn resume(self, console: BdAddr) -> ControllerSession<Reconnecting> {
        info!("Resuming with previously paired console {}", console);
        let next: ControllerSession<Reconnecting> = self.transition_with(console);
        next.publish(ConnectionState::Reconnecting);
        next
    }
}

impl ControllerSession<Connecting> {
    /// Binds and listens on both PSMs, then becomes discoverable.
    pub fn listen(mut self) -> Result<ControllerSession<Pairing>, SessionError> {
        let local = self.adapter.address();
        let listener = self.connector.listen(local)?;
        self.adapter.set_discoverable(true)?;
        self.listener = Some(listener);

        let next: ControllerSession<Pairing> = self.transition();
        next.publish(ConnectionState::Pairing);
        Ok(next)
    }
}

impl ControllerSession<Pairing> {
    /// Accepts one console and runs the handshake until it sets the player
    /// lights. Any transport error here is fatal.
    pub fn pair(mut self) -> Result<ControllerSession<Connected>, SessionError> {
        let mut listener = self.listener.take().ok_or(SessionError::MissingListener)?;
        let pair = listener.accept()?;
        drop(listener);

        let transport = TransportSession::new(pair)?;
        let mut link = ActiveLink::new(transport, self.fresh_protocol());
        link.prompt()?;
        link.transport.set_nonblocking()?;
        self.aggregator.reset_pending();

        info!(
            "Pairing with console {}",
            link.transport.console_address()
        );
        let mut rounds: u64 = 0;
        loop {
            rounds += 1;
            let reply = link.transport.recv_reply()?;
            link.protocol.process_commands(reply.as_deref());
            let report = link.protocol.get_report();
            log_exchange(reply.as_deref(), &report);

            match link.transport.send_report(&report) {
                Ok(()) => {}
                Err(TransportError::WouldBlock) => trace!("Pairing report would block"),
                Err(fault) => return Err(fault.into()),
            }

            if reply.as_deref().is_some_and(is_pairing_accepted) {
                info!("Console accepted pairing after {} rounds", rounds);
                break;
            }

            thread::sleep(self.settings.pairing_interval);
        }

        self.link = Some(link);
        let mut next: ControllerSession<Connected> = self.transition();
        next.on_connected();
        Ok(next)
    }
}

impl ControllerSession<Connected> {
    fn on_connected(&mut self) {
        self.counter.reset();
        self.publish(ConnectionState::Connected);
    }

    /// Runs the steady state loop until the link faults, then picks the
    /// recovery path. Only a missing link is fatal.
    pub fn serve(mut self) -> Result<Recovery, SessionError> {
        let mut link = self
            .link
            .take()
            .ok_or(SessionError::MissingLink(ConnectionState::Connected))?;
        let cadence = self.identity.controller_type.report_interval();
        let console = link.transport.console_address();
        info!("Serving console {} every {:?}", console, cadence);

        loop {
            if let Err(fault) = self.tick(&mut link, cadence) {
                warn!("Lost console {}: {}", console, fault);
                break;
            }
            thread::sleep(cadence);
        }
        drop(link);

        Ok(match self.counter.next_action(console) {
            RecoveryAction::Reconnect(target) => {
                let next: ControllerSession<Reconnecting> = self.transition_with(target);
                next.publish(ConnectionState::Reconnecting);
                Recovery::Reconnect(next)
            }
            RecoveryAction::FreshConnect => {
                let next: ControllerSession<Connecting> = self.transition();
                next.publish(ConnectionState::Connecting);
                Recovery::Connect(next)
            }
        })
    }

    fn tick(&mut self, link: &mut ActiveLink, cadence: Duration) -> Result<(), TransportError> {
        let reply = link.transport.recv_reply()?;

        if let Some(request) = self.tasks.as_mut().and_then(TaskSource::poll) {
            debug!("Applying task {:?}", request);
            request.apply(&mut self.aggregator, cadence);
        }
        self.refresh_live_input();

        link.protocol.process_commands(reply.as_deref());
        self.aggregator
            .set_protocol_input(&mut link.protocol, self.status.as_ref());
        let report = link.protocol.get_report();
        log_exchange(reply.as_deref(), &report);

        match link.transport.send_report(&report) {
            Err(TransportError::WouldBlock) => {
                trace!("Interrupt channel busy, report skipped");
                Ok(())
            }
            other => other,
        }
    }

    fn refresh_live_input(&mut self) {
        let Some(live) = self.live_input.as_mut() else {
            return;
        };
        match live.has_changed() {
            Ok(true) => {
                let frame = *live.borrow_and_update();
                self.aggregator.set_live_input(frame);
            }
            Ok(false) => {}
            Err(_) => {
                debug!("Live input sender dropped, keeping last state");
                self.live_input = None;
            }
        }
    }
}

impl ControllerSession<Reconnecting> {
    pub fn target(&self) -> Option<BdAddr> {
        self.get_state_data().copied()
    }

    /// One reconnect attempt. Socket failures count against the reconnect
    /// budget and are never fatal.
    pub fn attempt(mut self) -> Result<ReconnectOutcome, SessionError> {
        let target = self.target().ok_or(SessionError::MissingTarget)?;
        info!(
            "Reconnecting to {} (previous failures: {})",
            target,
            self.counter.value()
        );

        match self.open_link(target) {
            Ok(link) => {
                self.link = Some(link);
                self.aggregator.reset_pending();
                let mut next: ControllerSession<Connected> = self.transition();
                next.on_connected();
                Ok(ReconnectOutcome::Connected(next))
            }
            Err(e) => {
                warn!("Reconnect to {} failed: {}", target, e);
                self.counter.record_failure();
                thread::sleep(self.settings.reconnect_delay);

                if self.counter.allows_reconnect() {
                    Ok(ReconnectOutcome::Retry(self))
                } else {
                    info!(
                        "Giving up on {} after {} failed reconnects, waiting for any console",
                        target,
                        self.counter.value()
                    );
                    let next: ControllerSession<Connecting> = self.transition();
                    next.publish(ConnectionState::Connecting);
                    Ok(ReconnectOutcome::Exhausted(next))
                }
            }
        }
    }

    fn open_link(&mut self, target: BdAddr) -> Result<ActiveLink, TransportError> {
        let pair = self.connector.connect(target)?;
        let mut transport = TransportSession::new(pair)?;
        transport.set_nonblocking()?;
        let mut link = ActiveLink::new(transport, self.fresh_protocol());
        link.prompt()?;
        Ok(link)
    }
}

fn pair_fresh(
    connecting: ControllerSession<Connecting>,
    lock: Option<&AdapterLock>,
) -> Result<ControllerSession<Connected>, SessionError> {
    let _guard = lock.map(AdapterLock::acquire);
    connecting.listen()?.pair()
}

fn settle(
    mut reconnecting: ControllerSession<Reconnecting>,
    lock: Option<&AdapterLock>,
) -> Result<ControllerSession<Connected>, SessionError> {
    loop {
        reconnecting = match reconnecting.attempt()? {
            ReconnectOutcome::Connected(connected) => return Ok(connected),
            ReconnectOutcome::Retry(again) => again,
            ReconnectOutcome::Exhausted(connecting) => return pair_fresh(connecting, lock),
        };
    }
}

/// Owns everything one emulated controller needs and runs it to completion.
pub struct ControllerServer {
    identity: ControllerIdentity,
    adapter: Box<dyn BluetoothAdapter>,
    connector: Box<dyn Connector>,
    settings: SessionSettings,
    lock: Option<AdapterLock>,
    channels: SessionChannels,
}

impl ControllerServer {
    pub fn new(
        controller_type: ControllerType,
        body_color: Option<Color>,
        button_color: Option<Color>,
        adapter: Box<dyn BluetoothAdapter>,
        connector: Box<dyn Connector>,
    ) -> Self {
        let identity =
            ControllerIdentity::new(controller_type, body_color, button_color, adapter.address());
        info!(
            "Created {} on adapter {} (body {}, buttons {})",
            identity.controller_type,
            identity.adapter_address,
            identity.body_color,
            identity.button_color
        );

        Self {
            identity,
            adapter,
            connector,
            settings: SessionSettings::default(),
            lock: None,
            channels: SessionChannels::default(),
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_lock(mut self, lock: AdapterLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_status(mut self, status: StatusSink) -> Self {
        self.channels.status = Some(status);
        self
    }

    pub fn with_tasks(mut self, tasks: mpsc::Receiver<TaskRequest>) -> Self {
        self.channels.tasks = Some(tasks);
        self
    }

    pub fn with_live_input(mut self, live_input: watch::Receiver<InputFrame>) -> Self {
        self.channels.live_input = Some(live_input);
        self
    }

    pub fn identity(&self) -> &ControllerIdentity {
        &self.identity
    }

    /// Runs the session until a fatal error.
    ///
    /// With a status sink the error is published as `Crashed` and `Ok(())`
    /// is returned; without one the error is handed back to the caller.
    pub fn run(self, reconnect_address: Option<BdAddr>) -> Result<(), SessionError> {
        let status = self.channels.status.clone();
        let err = match self.drive(reconnect_address) {
            Ok(never) => match never {},
            Err(err) => err,
        };

        error!("Controller session crashed: {}", err);
        match status {
            Some(sink) => {
                sink.crashed(err.to_string());
                Ok(())
            }
            None => Err(err),
        }
    }

    fn drive(self, reconnect_address: Option<BdAddr>) -> Result<Infallible, SessionError> {
        let ControllerServer {
            identity,
            adapter,
            connector,
            settings,
            lock,
            channels,
        } = self;
        let session =
            ControllerSession::<Uninitialized>::create(identity, adapter, connector, settings, channels);

        let mut connected = {
            let _guard = lock.as_ref().map(AdapterLock::acquire);
            let initializing = session.start().setup_adapter()?;
            match reconnect_address {
                // Lock is already held, the fallback must not take it again.
                Some(console) => settle(initializing.resume(console), None)?,
                None => initializing.connect().listen()?.pair()?,
            }
        };

        loop {
            connected = match connected.serve()? {
                Recovery::Reconnect(reconnecting) => settle(reconnecting, lock.as_ref())?,
                Recovery::Connect(connecting) => pair_fresh(connecting, lock.as_ref())?,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ControllerServer, SessionError};
    use crate::controller::ControllerType;
    use crate::input::{Buttons, InputFrame};
    use crate::session::testing::*;
    use crate::session::ConnectionState::{self, *};
    use crate::session::{AdapterLock, SessionEvent, StatusSink, StatusUpdate, TaskRequest};
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::watch;

    fn events(rx: &mut UnboundedReceiver<StatusUpdate>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update.event);
        }
        out
    }

    fn states(events: &[SessionEvent]) -> Vec<ConnectionState> {
        events.iter().filter_map(SessionEvent::state).collect()
    }

    fn server(adapter: MockAdapter, connector: MockConnector) -> ControllerServer {
        ControllerServer::new(
            ControllerType::ProController,
            None,
            None,
            Box::new(adapter),
            Box::new(connector),
        )
        .with_settings(fast_settings())
    }

    #[test]
    fn setup_failure_propagates_without_a_status_sink() {
        let (adapter, _) = MockAdapter::failing();
        let (connector, _) = MockConnector::new(vec![], vec![]);
        let result = server(adapter, connector).run(None);
        assert!(matches!(result, Err(SessionError::Adapter(_))));
    }

    #[test]
    fn setup_failure_is_published_as_crash() {
        let (adapter, _) = MockAdapter::failing();
        let (connector, _) = MockConnector::new(vec![], vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = server(adapter, connector)
            .with_status(StatusSink::new(0, tx))
            .run(None);
        assert!(result.is_ok());

        let events = events(&mut rx);
        assert_eq!(states(&events), vec![Initializing, Crashed]);
        match events.last() {
            Some(SessionEvent::Crashed { errors }) => assert!(errors.contains("no adapter")),
            other => panic!("expected crash, got {:?}", other),
        }
    }

    #[test]
    fn pairs_and_recovers_with_a_single_reconnect() {
        let (first, first_log) = MockChannel::interrupt(
            vec![Step::Ok, Step::Ok, Step::Ok, Step::Ok],
            Step::Reset,
            vec![Some(player_lights_frame())],
        );
        let (second, second_log) =
            MockChannel::interrupt(vec![Step::Ok, Step::Ok, Step::Ok], Step::Reset, vec![]);
        let (adapter, adapter_log) = MockAdapter::new();
        let (connector, connector_log) =
            MockConnector::new(vec![first], vec![Some(second)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        server(adapter, connector)
            .with_status(StatusSink::new(0, tx))
            .run(None)
            .unwrap();

        assert_eq!(
            states(&events(&mut rx)),
            vec![
                Initializing,
                Connecting,
                Pairing,
                Connected,
                Reconnecting,
                Connected,
                Reconnecting,
                Connecting,
                Crashed
            ]
        );

        let connector_log = connector_log.lock().unwrap();
        assert_eq!(connector_log.listens, 2);
        assert_eq!(connector_log.connects, vec![CONSOLE; 3]);
        assert_eq!(adapter_log.lock().unwrap().discoverable, vec![true]);

        let first_log = first_log.lock().unwrap();
        assert!(first_log.nonblocking);
        assert_eq!(first_log.sent.len(), 4);
        // Prompt, then the reply to the player lights, then full input.
        assert_eq!(first_log.sent[0][1], 0x30);
        assert_eq!(first_log.sent[1][1], 0x21);
        assert_eq!(first_log.sent[1][15], 0x30);
        assert_eq!(first_log.sent[2][1], 0x30);

        let second_log = second_log.lock().unwrap();
        assert!(second_log.nonblocking);
        assert_eq!(second_log.sent.len(), 3);
    }

    #[test]
    fn only_a_full_length_player_lights_frame_completes_pairing() {
        let mut short_lights = player_lights_frame();
        short_lights.truncate(45);
        let mut vibration = player_lights_frame();
        vibration[11] = 0x48;

        let (first, first_log) = MockChannel::interrupt(
            vec![Step::Ok; 6],
            Step::Reset,
            vec![
                Some(short_lights),
                Some(vibration),
                None,
                Some(player_lights_frame()),
            ],
        );
        let (adapter, _) = MockAdapter::new();
        let (connector, _) = MockConnector::new(vec![first], vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        server(adapter, connector)
            .with_status(StatusSink::new(0, tx))
            .run(None)
            .unwrap();

        let states = states(&events(&mut rx));
        assert_eq!(
            states,
            vec![
                Initializing,
                Connecting,
                Pairing,
                Connected,
                Reconnecting,
                Connecting,
                Crashed
            ]
        );

        // Prompt, four pairing rounds, then exactly one steady report.
        let first_log = first_log.lock().unwrap();
        assert_eq!(first_log.sent.len(), 6);
        assert_eq!(first_log.send_attempts, 7);
        assert_eq!(first_log.sent[0][1], 0x30);
        assert_eq!(first_log.sent[1][1], 0x21);
        assert_eq!(first_log.sent[1][15], 0x30);
        assert_eq!(first_log.sent[2][1], 0x21);
        assert_eq!(first_log.sent[2][15], 0x48);
        assert_eq!(first_log.sent[3][1], 0x30);
        assert_eq!(first_log.sent[4][1], 0x21);
        assert_eq!(first_log.sent[4][15], 0x30);
        assert_eq!(first_log.sent[5][1], 0x30);
    }

    #[test]
    fn would_block_never_counts_as_a_fault() {
        let (first, first_log) = MockChannel::interrupt(
            vec![
                Step::Ok,
                Step::Ok,
                Step::WouldBlock,
                Step::WouldBlock,
                Step::WouldBlock,
            ],
            Step::Reset,
            vec![Some(player_lights_frame())],
        );
        let (adapter, _) = MockAdapter::new();
        let (connector, connector_log) = MockConnector::new(vec![first], vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        server(adapter, connector)
            .with_status(StatusSink::new(0, tx))
            .run(None)
            .unwrap();

        assert_eq!(
            states(&events(&mut rx)),
            vec![
                Initializing,
                Connecting,
                Pairing,
                Connected,
                Reconnecting,
                Connecting,
                Crashed
            ]
        );
        let first_log = first_log.lock().unwrap();
        assert_eq!(first_log.send_attempts, 6);
        assert_eq!(first_log.sent.len(), 2);
        // Two failed reconnects, then a fresh connect instead of a third.
        assert_eq!(connector_log.lock().unwrap().connects.len(), 2);
    }

    #[test]
    fn counter_resets_after_a_successful_reconnect() {
        let (first, _) = MockChannel::interrupt(
            vec![Step::Ok, Step::Ok],
            Step::Reset,
            vec![Some(player_lights_frame())],
        );
        let (second, _) = MockChannel::interrupt(vec![Step::Ok], Step::Reset, vec![]);
        let (adapter, _) = MockAdapter::new();
        let (connector, connector_log) =
            MockConnector::new(vec![first], vec![None, Some(second)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        server(adapter, connector)
            .with_status(StatusSink::new(0, tx))
            .run(None)
            .unwrap();

        assert_eq!(
            states(&events(&mut rx)),
            vec![
                Initializing,
                Connecting,
                Pairing,
                Connected,
                Reconnecting,
                Connected,
                Reconnecting,
                Connecting,
                Crashed
            ]
        );
        // One failure and a success, then a full budget of two again.
        assert_eq!(connector_log.lock().unwrap().connects.len(), 4);
    }

    #[test]
    fn known_console_is_tried_before_pairing() {
        let (first, _) = MockChannel::interrupt(
            vec![Step::Ok, Step::Ok],
            Step::Reset,
            vec![Some(player_lights_frame())],
        );
        let (adapter, _) = MockAdapter::new();
        let (connector, connector_log) = MockConnector::new(vec![first], vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        server(adapter, connector)
            .with_lock(AdapterLock::new())
            .with_status(StatusSink::new(0, tx))
            .run(Some(CONSOLE))
            .unwrap();

        assert_eq!(
            states(&events(&mut rx)),
            vec![
                Initializing,
                Reconnecting,
                Connecting,
                Pairing,
                Connected,
                Reconnecting,
                Connecting,
                Crashed
            ]
        );
        let connector_log = connector_log.lock().unwrap();
        assert_eq!(connector_log.connects.len(), 4);
        assert_eq!(connector_log.listens, 2);
    }

    #[test]
    fn queued_macros_and_live_input_reach_the_reports() {
        let (first, first_log) = MockChannel::interrupt(
            vec![Step::Ok, Step::Ok, Step::Ok, Step::Ok],
            Step::Reset,
            vec![Some(player_lights_frame())],
        );
        let (adapter, _) = MockAdapter::new();
        let (connector, _) = MockConnector::new(vec![first], vec![]);
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let (task_tx, task_rx) = mpsc::channel(4);
        let (_live_tx, live_rx) = watch::channel(InputFrame::pressing(Buttons::B));

        task_tx
            .try_send(TaskRequest::RunMacro {
                macro_id: "jump".into(),
                script: "A 0.001s".into(),
            })
            .unwrap();

        server(adapter, connector)
            .with_status(StatusSink::new(0, status_tx))
            .with_tasks(task_rx)
            .with_live_input(live_rx)
            .run(None)
            .unwrap();

        let events = events(&mut status_rx);
        assert!(events.contains(&SessionEvent::MacroFinished {
            macro_id: "jump".into()
        }));

        let first_log = first_log.lock().unwrap();
        let buttons = |report: &Vec<u8>| Buttons::from_report_bytes([report[4], report[5], report[6]]);
        assert_eq!(buttons(&first_log.sent[2]), Buttons::A);
        assert_eq!(buttons(&first_log.sent[3]), Buttons::B);
    }
}
