//! Input side of the controller.
//!
//! - [`frame`] - button, stick and IMU state for one report
//! - [`macros`] - the macro language and its expansion into per-tick frames
//! - [`aggregator`] - live input and macro playback merged once per tick
//!
//! ```text
//! live input ──┐
//!              ├──► InputAggregator ──► ControllerProtocol
//! macros ──────┘      (one frame/tick)
//! ```

pub mod aggregator;
pub mod frame;
pub mod macros;

pub use aggregator::{InputAggregator, MacroId};
pub use frame::{Buttons, ImuSample, InputFrame, StickPosition};
pub use macros::{compile, parse_frame, parse_macro, MacroError, TimedFrame};
