//! Emulates Nintendo Switch controllers (Pro Controller, Joy-Con L/R) as
//! Bluetooth HID devices.
//!
//! ```text
//! stdin / watch ──► input ──► protocol ──► transport ──► console
//!                     ▲           ▲            │
//!                     └── session (cadence, recovery) ◄──┘
//! ```

pub mod bluetooth;
pub mod config;
pub mod controller;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transport;
