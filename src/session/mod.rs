//! One emulated controller's life cycle.
//!
//! - [`server`] - the typestate machine and [`ControllerServer`] driving it
//! - [`recovery`] - reconnect budget and what to do after a lost link
//! - [`task`] - macro requests arriving from outside the session
//! - [`status`] - state changes published to an observer
//! - [`lock`] - coarse adapter lock shared by sibling sessions

pub mod error;
pub mod lock;
pub mod recovery;
pub mod server;
pub mod settings;
pub mod state;
pub mod status;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SessionError;
pub use lock::AdapterLock;
pub use recovery::{ReconnectCounter, RecoveryAction};
pub use server::{
    ControllerServer, ControllerSession, ReconnectOutcome, Recovery, SessionChannels,
};
pub use settings::SessionSettings;
pub use state::ConnectionState;
pub use status::{SessionEvent, StatusSink, StatusUpdate};
pub use task::{TaskRequest, TaskSource};
