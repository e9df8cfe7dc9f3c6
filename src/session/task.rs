//! Externally submitted work, drained at most one request per tick.

use crate::input::{compile, InputAggregator, InputFrame, MacroId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRequest {
    /// Script in the macro language, compiled at the session's cadence.
    RunMacro { macro_id: MacroId, script: String },
    /// Frames already expanded to one per tick.
    BufferFrames {
        macro_id: MacroId,
        frames: Vec<InputFrame>,
    },
    StopMacro { macro_id: MacroId },
    ClearMacros,
}

impl TaskRequest {
    /// Applies the request. Scripts that fail to parse are dropped with a
    /// warning and leave the aggregator untouched.
    pub fn apply(self, aggregator: &mut InputAggregator, tick: Duration) {
        match self {
            TaskRequest::RunMacro { macro_id, script } => match compile(&script, tick) {
                Ok(frames) => aggregator.buffer_macro(frames, macro_id),
                Err(e) => warn!("Dropping macro {}: {}", macro_id, e),
            },
            TaskRequest::BufferFrames { macro_id, frames } => {
                aggregator.buffer_macro(frames, macro_id)
            }
            TaskRequest::StopMacro { macro_id } => {
                if !aggregator.stop_macro(&macro_id) {
                    debug!("Macro {} was not queued", macro_id);
                }
            }
            TaskRequest::ClearMacros => {
                aggregator.clear_macros();
            }
        }
    }
}

/// Receiving end of a session's task queue.
#[derive(Debug)]
pub struct TaskSource {
    receiver: mpsc::Receiver<TaskRequest>,
    closed: bool,
}

impl TaskSource {
    pub fn new(receiver: mpsc::Receiver<TaskRequest>) -> Self {
        Self {
            receiver,
            closed: false,
        }
    }

    /// Non-blocking pop. `None` when the queue is empty or closed.
    pub fn poll(&mut self) -> Option<TaskRequest> {
        if self.closed {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(request) => Some(request),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                debug!("Task queue closed, no further tasks");
                self.closed = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Buttons;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn valid_scripts_are_buffered() {
        let mut aggregator = InputAggregator::new();
        TaskRequest::RunMacro {
            macro_id: "a".into(),
            script: "A 0.02s".into(),
        }
        .apply(&mut aggregator, TICK);
        assert_eq!(aggregator.active_macro(), Some("a"));
    }

    #[test]
    fn expanded_frames_are_buffered_as_is() {
        let mut aggregator = InputAggregator::new();
        TaskRequest::BufferFrames {
            macro_id: "raw".into(),
            frames: vec![InputFrame::pressing(Buttons::X); 3],
        }
        .apply(&mut aggregator, TICK);
        assert_eq!(aggregator.active_macro(), Some("raw"));
    }

    #[test]
    fn malformed_scripts_are_dropped() {
        let mut aggregator = InputAggregator::new();
        TaskRequest::RunMacro {
            macro_id: "bad".into(),
            script: "SMASH 1s".into(),
        }
        .apply(&mut aggregator, TICK);
        assert_eq!(aggregator.queued_macros(), 0);
    }

    #[test]
    fn oversized_scripts_are_dropped_without_panicking() {
        let mut aggregator = InputAggregator::new();
        for script in ["A 1e30s", "LOOP 4000000000\n  A 0.1s", "B 1e9s"] {
            TaskRequest::RunMacro {
                macro_id: "huge".into(),
                script: script.into(),
            }
            .apply(&mut aggregator, TICK);
        }
        assert_eq!(aggregator.queued_macros(), 0);
    }

    #[test]
    fn stop_and_clear() {
        let mut aggregator = InputAggregator::new();
        aggregator.buffer_macro(vec![InputFrame::pressing(Buttons::A)], "a".into());
        aggregator.buffer_macro(vec![InputFrame::pressing(Buttons::B)], "b".into());

        TaskRequest::StopMacro {
            macro_id: "a".into(),
        }
        .apply(&mut aggregator, TICK);
        assert_eq!(aggregator.active_macro(), Some("b"));

        TaskRequest::ClearMacros.apply(&mut aggregator, TICK);
        assert_eq!(aggregator.queued_macros(), 0);
    }

    #[test]
    fn poll_never_blocks() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = TaskSource::new(rx);
        assert_eq!(source.poll(), None);

        tx.try_send(TaskRequest::ClearMacros).unwrap();
        assert_eq!(source.poll(), Some(TaskRequest::ClearMacros));

        drop(tx);
        assert_eq!(source.poll(), None);
        assert_eq!(source.poll(), None);
    }
}
