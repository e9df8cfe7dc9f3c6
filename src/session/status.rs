//! Observer channel for session progress.
//!
//! Sessions never expose shared mutable status. They push [`StatusUpdate`]s
//! into an unbounded channel and the owner consumes them at its own pace.

use crate::input::MacroId;
use crate::session::state::ConnectionState;
use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    State(ConnectionState),
    Crashed { errors: String },
    MacroFinished { macro_id: MacroId },
}

impl SessionEvent {
    /// Connection state implied by the event, if any.
    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            SessionEvent::State(state) => Some(*state),
            SessionEvent::Crashed { .. } => Some(ConnectionState::Crashed),
            SessionEvent::MacroFinished { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub controller: usize,
    pub at: DateTime<Local>,
    pub event: SessionEvent,
}

/// Sending half handed to a session. Cloneable, one per controller index.
#[derive(Debug, Clone)]
pub struct StatusSink {
    controller: usize,
    sender: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSink {
    pub fn new(controller: usize, sender: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { controller, sender }
    }

    pub fn controller(&self) -> usize {
        self.controller
    }

    pub fn publish(&self, event: SessionEvent) {
        let update = StatusUpdate {
            controller: self.controller,
            at: Local::now(),
            event,
        };
        if self.sender.send(update).is_err() {
            debug!(
                "Status receiver for controller {} is gone, dropping update",
                self.controller
            );
        }
    }

    pub fn state(&self, state: ConnectionState) {
        self.publish(SessionEvent::State(state));
    }

    pub fn crashed(&self, errors: String) {
        self.publish(SessionEvent::Crashed { errors });
    }

    pub fn macro_finished(&self, macro_id: MacroId) {
        self.publish(SessionEvent::MacroFinished { macro_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_carry_the_controller_index() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = StatusSink::new(3, tx);
        sink.state(ConnectionState::Pairing);
        sink.crashed("adapter vanished".into());

        let first = rx.try_recv().unwrap();
        assert_eq!(first.controller, 3);
        assert_eq!(first.event, SessionEvent::State(ConnectionState::Pairing));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.event.state(), Some(ConnectionState::Crashed));
    }

    #[test]
    fn publishing_without_a_receiver_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        StatusSink::new(0, tx).macro_finished("m1".into());
    }
}
