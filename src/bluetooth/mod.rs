//! Local Bluetooth adapter.
//!
//! The session only needs three things from the adapter: its address, a
//! one-off setup that makes it look like a controller, and toggling
//! discoverability while waiting for a console. [`bluez`] implements this
//! over BlueZ's D-Bus API.

pub mod bluez;

pub use bluez::BluezAdapter;

use crate::controller::ControllerIdentity;
use crate::transport::{AddressError, BdAddr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("D-Bus call failed: {0}")]
    DbusCall(#[from] zbus::fdo::Error),

    #[error("Adapter reported an invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Adapter property {0} has an unexpected type")]
    PropertyType(&'static str),

    #[error("Adapter unavailable: {0}")]
    Unavailable(String),
}

pub trait BluetoothAdapter: Send {
    fn address(&self) -> BdAddr;

    /// Registers the HID service record and presents the adapter as the
    /// given controller.
    fn setup(&mut self, identity: &ControllerIdentity) -> Result<(), AdapterError>;

    fn set_discoverable(&mut self, discoverable: bool) -> Result<(), AdapterError>;
}
