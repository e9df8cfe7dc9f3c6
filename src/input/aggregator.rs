//! Merges live input with queued macros, one frame per report tick.
//!
//! Macros play back in submission order. While one is active its frames
//! replace live input entirely; once exhausted, live input takes over again.

use crate::input::frame::InputFrame;
use crate::protocol::ControllerProtocol;
use crate::session::StatusSink;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Opaque identifier chosen by whoever submits a macro.
pub type MacroId = String;

#[derive(Debug)]
struct QueuedMacro {
    id: MacroId,
    frames: VecDeque<InputFrame>,
}

#[derive(Debug, Default)]
pub struct InputAggregator {
    macros: VecDeque<QueuedMacro>,
    live: InputFrame,
    pending: InputFrame,
}

impl InputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_macro(&mut self, frames: Vec<InputFrame>, macro_id: MacroId) {
        if frames.is_empty() {
            debug!("Ignoring empty macro {}", macro_id);
            return;
        }
        info!("Buffered macro {} ({} frames)", macro_id, frames.len());
        self.macros.push_back(QueuedMacro {
            id: macro_id,
            frames: frames.into(),
        });
    }

    /// Removes a queued or playing macro. Returns whether it was found.
    pub fn stop_macro(&mut self, macro_id: &str) -> bool {
        let before = self.macros.len();
        self.macros.retain(|queued| queued.id != macro_id);
        let removed = self.macros.len() != before;
        if removed {
            info!("Stopped macro {}", macro_id);
        }
        removed
    }

    pub fn clear_macros(&mut self) -> usize {
        let cleared = self.macros.len();
        self.macros.clear();
        info!("Cleared {} macros", cleared);
        cleared
    }

    pub fn active_macro(&self) -> Option<&str> {
        self.macros.front().map(|queued| queued.id.as_str())
    }

    pub fn queued_macros(&self) -> usize {
        self.macros.len()
    }

    pub fn set_live_input(&mut self, frame: InputFrame) {
        self.live = frame;
    }

    pub fn pending(&self) -> &InputFrame {
        &self.pending
    }

    /// Back to a neutral pending frame, for a freshly created protocol engine.
    pub fn reset_pending(&mut self) {
        self.pending = InputFrame::neutral();
    }

    /// Per-tick step: takes at most one macro frame, otherwise the latest live
    /// input, and hands it to the protocol engine.
    pub fn set_protocol_input(
        &mut self,
        protocol: &mut ControllerProtocol,
        status: Option<&StatusSink>,
    ) -> InputFrame {
        self.pending = match self.macros.front_mut() {
            Some(active) => {
                let frame = active.frames.pop_front().unwrap_or(self.live);
                if active.frames.is_empty() {
                    if let Some(finished) = self.macros.pop_front() {
                        debug!("Macro {} finished", finished.id);
                        if let Some(sink) = status {
                            sink.macro_finished(finished.id);
                        }
                    }
                }
                frame
            }
            None => self.live,
        };

        protocol.set_input_frame(self.pending);
        self.pending
    }
}
