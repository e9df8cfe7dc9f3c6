//! Static description of the emulated controller.
//!
//! - [`identity`] - controller type, colours, adapter address and the
//!   capability table derived from the type (device id, cadence, sticks)
//! - [`calibration`] - factory stick calibration and 12-bit stick packing
//!
//! Nothing in here changes once a session has been created.

pub mod calibration;
pub mod identity;

pub use calibration::{StickCalibration, LEFT_STICK, RIGHT_STICK};
pub use identity::{Color, ColorError, ControllerIdentity, ControllerType, REPORT_LENGTH};
