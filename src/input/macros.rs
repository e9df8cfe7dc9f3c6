//! Macro language for scripted input.
//!
//! One instruction per line. Button names and stick positions are followed by
//! a hold duration; a bare duration is a neutral wait. `LOOP n` repeats the
//! more deeply indented block below it.
//!
//! ```text
//! LOOP 3
//!     B 0.1s
//!     0.1s
//! A DPAD_UP 0.5s
//! L_STICK@+000+100 R_STICK@-050+000 0.75s
//! ```
//!
//! Scripts are compiled into one [`InputFrame`] per report tick so that the
//! aggregator can play them back frame by frame.

use crate::input::frame::{Buttons, InputFrame, StickPosition};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a compiled macro: ten minutes at 120 Hz.
pub const MAX_FRAMES: usize = 120 * 60 * 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("Line {line}: unknown token `{token}`")]
    UnknownToken { line: usize, token: String },

    #[error("Line {line}: instruction has no trailing duration")]
    MissingDuration { line: usize },

    #[error("Line {line}: invalid duration `{value}`")]
    InvalidDuration { line: usize, value: String },

    #[error("Line {line}: invalid stick position `{value}`")]
    InvalidStick { line: usize, value: String },

    #[error("Line {line}: invalid loop count `{value}`")]
    InvalidLoopCount { line: usize, value: String },

    #[error("Line {line}: LOOP has no indented body")]
    EmptyLoop { line: usize },

    #[error("Macro contains no instructions")]
    Empty,

    #[error("Macro expands to more than {limit} frames")]
    TooLong { limit: usize },
}

/// A frame held for a wall-clock duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedFrame {
    pub frame: InputFrame,
    pub duration: Duration,
}

#[derive(Debug)]
struct Line<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

/// Parses a script into timed frames, loops unrolled.
pub fn parse_macro(script: &str) -> Result<Vec<TimedFrame>, MacroError> {
    let lines: Vec<Line<'_>> = script
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                return None;
            }
            Some(Line {
                number: idx + 1,
                indent: raw.len() - raw.trim_start().len(),
                text,
            })
        })
        .collect();

    let steps = parse_block(&lines)?;
    if steps.is_empty() {
        return Err(MacroError::Empty);
    }
    Ok(steps)
}

fn parse_block(lines: &[Line<'_>]) -> Result<Vec<TimedFrame>, MacroError> {
    let mut steps = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = &lines[idx];
        let mut tokens = line.text.split_whitespace();

        if tokens.next() == Some("LOOP") {
            let count_token = tokens.next().unwrap_or("");
            let count: usize = count_token
                .parse()
                .map_err(|_| MacroError::InvalidLoopCount {
                    line: line.number,
                    value: count_token.to_string(),
                })?;

            let body_len = lines[idx + 1..]
                .iter()
                .take_while(|next| next.indent > line.indent)
                .count();
            if body_len == 0 {
                return Err(MacroError::EmptyLoop { line: line.number });
            }

            let body = parse_block(&lines[idx + 1..idx + 1 + body_len])?;
            body.len()
                .checked_mul(count)
                .and_then(|unrolled| unrolled.checked_add(steps.len()))
                .filter(|total| *total <= MAX_FRAMES)
                .ok_or(MacroError::TooLong { limit: MAX_FRAMES })?;
            for _ in 0..count {
                steps.extend_from_slice(&body);
            }
            idx += 1 + body_len;
            continue;
        }

        steps.push(parse_step(line)?);
        idx += 1;
    }

    Ok(steps)
}

fn parse_step(line: &Line<'_>) -> Result<TimedFrame, MacroError> {
    let tokens: Vec<&str> = line.text.split_whitespace().collect();
    let Some((last, inputs)) = tokens.split_last() else {
        return Err(MacroError::MissingDuration { line: line.number });
    };

    if !last.ends_with('s') || last.contains('@') {
        return Err(MacroError::MissingDuration { line: line.number });
    }
    let duration = parse_duration(line.number, last)?;
    let frame = parse_inputs(line.number, inputs)?;

    Ok(TimedFrame { frame, duration })
}

fn parse_duration(line: usize, token: &str) -> Result<Duration, MacroError> {
    let invalid = || MacroError::InvalidDuration {
        line,
        value: token.to_string(),
    };
    let seconds: f64 = token
        .trim_end_matches('s')
        .parse()
        .map_err(|_| invalid())?;
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

fn parse_inputs(line: usize, tokens: &[&str]) -> Result<InputFrame, MacroError> {
    let mut frame = InputFrame::neutral();

    for token in tokens {
        if let Some(value) = token.strip_prefix("L_STICK@") {
            frame.left_stick = parse_stick(line, value)?;
        } else if let Some(value) = token.strip_prefix("R_STICK@") {
            frame.right_stick = parse_stick(line, value)?;
        } else if let Some(button) = Buttons::from_name(token) {
            frame.buttons |= button;
        } else {
            return Err(MacroError::UnknownToken {
                line,
                token: token.to_string(),
            });
        }
    }

    Ok(frame)
}

/// Parses `+XXX-YYY` style stick coordinates.
fn parse_stick(line: usize, value: &str) -> Result<StickPosition, MacroError> {
    let invalid = || MacroError::InvalidStick {
        line,
        value: value.to_string(),
    };

    let split = value
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .ok_or_else(invalid)?;
    let (x, y) = value.split_at(split);

    let axis = |raw: &str| -> Result<i8, MacroError> {
        if !raw.starts_with(|c: char| c == '+' || c == '-') {
            return Err(invalid());
        }
        let parsed: i16 = raw.parse().map_err(|_| invalid())?;
        if !(-100..=100).contains(&parsed) {
            return Err(invalid());
        }
        Ok(parsed as i8)
    };

    Ok(StickPosition::new(axis(x)?, axis(y)?))
}

/// Parses a single line of input tokens without a duration, used for live
/// input coming from a front-end.
pub fn parse_frame(tokens: &str) -> Result<InputFrame, MacroError> {
    let tokens: Vec<&str> = tokens.split_whitespace().collect();
    parse_inputs(1, &tokens)
}

fn ticks_for(duration: Duration, tick: f64) -> usize {
    if tick > 0.0 {
        // Float to int casts saturate, huge durations land on usize::MAX.
        ((duration.as_secs_f64() / tick).round() as usize).max(1)
    } else {
        1
    }
}

/// Expands timed frames into one frame per report tick. Every step lasts at
/// least one tick; the whole macro at most [`MAX_FRAMES`].
pub fn expand(steps: &[TimedFrame], tick: Duration) -> Result<Vec<InputFrame>, MacroError> {
    let tick = tick.as_secs_f64();
    let counts: Vec<usize> = steps
        .iter()
        .map(|step| ticks_for(step.duration, tick))
        .collect();
    let total = counts
        .iter()
        .try_fold(0usize, |sum, count| sum.checked_add(*count))
        .filter(|total| *total <= MAX_FRAMES)
        .ok_or(MacroError::TooLong { limit: MAX_FRAMES })?;

    let mut frames = Vec::with_capacity(total);
    for (step, count) in steps.iter().zip(counts) {
        frames.extend(std::iter::repeat(step.frame).take(count));
    }
    Ok(frames)
}

/// Parses and expands a script at the given report cadence.
pub fn compile(script: &str, tick: Duration) -> Result<Vec<InputFrame>, MacroError> {
    expand(&parse_macro(script)?, tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn buttons_and_sticks_on_one_line() {
        let steps = parse_macro("A B L_STICK@+050-100 0.5s").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].frame.buttons, Buttons::A | Buttons::B);
        assert_eq!(steps[0].frame.left_stick, StickPosition::new(50, -100));
        assert_eq!(steps[0].frame.right_stick, StickPosition::CENTER);
        assert_eq!(steps[0].duration, Duration::from_millis(500));
    }

    #[test]
    fn bare_duration_is_a_neutral_wait() {
        let steps = parse_macro("0.25s").unwrap();
        assert!(steps[0].frame.is_neutral());
    }

    #[test]
    fn loops_unroll_their_indented_body() {
        let script = "LOOP 2\n    B 0.1s\n    0.1s\nA 0.1s\n";
        let steps = parse_macro(script).unwrap();
        let buttons: Vec<Buttons> = steps.iter().map(|s| s.frame.buttons).collect();
        assert_eq!(
            buttons,
            vec![
                Buttons::B,
                Buttons::empty(),
                Buttons::B,
                Buttons::empty(),
                Buttons::A
            ]
        );
    }

    #[test]
    fn nested_loops() {
        let script = "LOOP 2\n  LOOP 3\n    A 0.1s\n  B 0.1s";
        let steps = parse_macro(script).unwrap();
        assert_eq!(steps.len(), 8);
        assert_eq!(steps[3].frame.buttons, Buttons::B);
    }

    #[test]
    fn expansion_rounds_to_ticks_with_a_floor_of_one() {
        let frames = compile("A 0.05s\nB 0.001s", TICK).unwrap();
        assert_eq!(frames.len(), 6);
        assert!(frames[..5].iter().all(|f| f.buttons == Buttons::A));
        assert_eq!(frames[5].buttons, Buttons::B);
    }

    #[test]
    fn reports_the_offending_line() {
        assert_eq!(
            parse_macro("A 0.1s\nJUMP 0.1s"),
            Err(MacroError::UnknownToken {
                line: 2,
                token: "JUMP".into()
            })
        );
        assert_eq!(
            parse_macro("A B"),
            Err(MacroError::MissingDuration { line: 1 })
        );
        assert!(matches!(
            parse_macro("L_STICK@+200+000 0.1s"),
            Err(MacroError::InvalidStick { line: 1, .. })
        ));
        assert_eq!(
            parse_macro("LOOP 2\nA 0.1s"),
            Err(MacroError::EmptyLoop { line: 1 })
        );
        assert_eq!(parse_macro("\n# comment only\n"), Err(MacroError::Empty));
    }

    #[test]
    fn durations_beyond_duration_range_are_rejected() {
        assert!(matches!(
            parse_macro("A 1e30s"),
            Err(MacroError::InvalidDuration { line: 1, .. })
        ));
        assert!(matches!(
            parse_macro("A -0.5s"),
            Err(MacroError::InvalidDuration { line: 1, .. })
        ));
        assert!(matches!(
            compile("B infs", TICK),
            Err(MacroError::InvalidDuration { line: 1, .. })
        ));
    }

    #[test]
    fn huge_loops_are_rejected_before_unrolling() {
        assert_eq!(
            parse_macro("LOOP 4000000000\n    A 0.1s"),
            Err(MacroError::TooLong { limit: MAX_FRAMES })
        );
        assert_eq!(
            parse_macro("LOOP 100000\n  LOOP 100000\n    A 0.1s"),
            Err(MacroError::TooLong { limit: MAX_FRAMES })
        );
    }

    #[test]
    fn long_holds_are_rejected_before_expanding() {
        let cadence = Duration::from_nanos(1_000_000_000 / 120);
        assert_eq!(
            compile("A 1e9s", cadence),
            Err(MacroError::TooLong { limit: MAX_FRAMES })
        );
        assert_eq!(compile("A 600s", cadence).map(|f| f.len()), Ok(MAX_FRAMES));
    }

    #[test]
    fn live_frame_without_duration() {
        let frame = parse_frame("ZL R_STICK@-100+000").unwrap();
        assert_eq!(frame.buttons, Buttons::ZL);
        assert_eq!(frame.right_stick, StickPosition::new(-100, 0));
    }
}
