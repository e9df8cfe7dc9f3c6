//! Switch HID wire protocol.
//!
//! - [`command`] - parsing console output reports and subcommands
//! - [`report`] - input report layout, encoding helpers and log formatting
//! - [`spi`] - emulated SPI flash contents
//! - [`engine`] - [`ControllerProtocol`], the per-transport protocol state
//!
//! # Exchange
//!
//! ```text
//! Console ──0xA2 frame──► process_commands ──► pending reply
//!    ▲                                              │
//!    └──────────0xA1 report◄── get_report ◄─────────┘
//! ```

pub mod command;
pub mod engine;
pub mod report;
pub mod spi;

pub use command::{is_pairing_accepted, ConsoleCommand, Subcommand, PLAYER_LIGHTS_ID};
pub use engine::ControllerProtocol;
pub use report::{
    decode_input, describe_console_message, describe_controller_message, InputReport,
    ReportInput,
};
pub use spi::SpiFlash;
