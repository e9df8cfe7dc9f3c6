//! Controller-originated input reports.
//!
//! ```text
//! [0]       0xA1 (DATA | INPUT)
//! [1]       report id: 0x30 full input, 0x21 subcommand reply
//! [2]       timer
//! [3]       battery level | connection info
//! [4..7]    buttons: right, shared, left
//! [7..10]   left stick
//! [10..13]  right stick
//! [13]      vibrator
//! [14]      ACK             (0x21)   | IMU samples [14..50] (0x30)
//! [15]      subcommand id   (0x21)
//! [16..50]  reply data      (0x21)
//! ```

use crate::controller::REPORT_LENGTH;
use crate::input::Buttons;
use crate::protocol::command::ConsoleCommand;
use std::fmt;

pub const INPUT_HEADER: u8 = 0xA1;
pub const FULL_INPUT_REPORT: u8 = 0x30;
pub const SUBCOMMAND_REPLY: u8 = 0x21;

/// Battery full, charging bit clear; OR'd with the connection nibble.
pub const BATTERY_FULL: u8 = 0x90;

pub const REPORT_ID: usize = 1;
pub const TIMER: usize = 2;
pub const BATTERY: usize = 3;
pub const BUTTONS: usize = 4;
pub const LEFT_STICK: usize = 7;
pub const RIGHT_STICK: usize = 10;
pub const VIBRATOR: usize = 13;
pub const ACK: usize = 14;
pub const IMU: usize = 14;
pub const REPLY_SUBCOMMAND: usize = 15;
pub const REPLY_DATA: usize = 16;

/// Fixed size report buffer with typed setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReport {
    bytes: [u8; REPORT_LENGTH],
}

impl Default for InputReport {
    fn default() -> Self {
        Self::neutral()
    }
}

impl InputReport {
    /// Header byte followed by zeros. Sent when nothing is pending.
    pub fn neutral() -> Self {
        let mut bytes = [0u8; REPORT_LENGTH];
        bytes[0] = INPUT_HEADER;
        Self { bytes }
    }

    pub fn set_report_id(&mut self, id: u8) -> &mut Self {
        self.bytes[REPORT_ID] = id;
        self
    }

    pub fn set_timer(&mut self, timer: u8) -> &mut Self {
        self.bytes[TIMER] = timer;
        self
    }

    pub fn set_battery(&mut self, connection_info: u8) -> &mut Self {
        self.bytes[BATTERY] = BATTERY_FULL | connection_info;
        self
    }

    pub fn set_buttons(&mut self, buttons: Buttons) -> &mut Self {
        self.bytes[BUTTONS..BUTTONS + 3].copy_from_slice(&buttons.to_report_bytes());
        self
    }

    pub fn set_left_stick(&mut self, stick: [u8; 3]) -> &mut Self {
        self.bytes[LEFT_STICK..LEFT_STICK + 3].copy_from_slice(&stick);
        self
    }

    pub fn set_right_stick(&mut self, stick: [u8; 3]) -> &mut Self {
        self.bytes[RIGHT_STICK..RIGHT_STICK + 3].copy_from_slice(&stick);
        self
    }

    pub fn set_vibrator(&mut self, value: u8) -> &mut Self {
        self.bytes[VIBRATOR] = value;
        self
    }

    /// Writes ACK, replied subcommand id and as much data as fits.
    pub fn set_reply(&mut self, ack: u8, subcommand: u8, data: &[u8]) -> &mut Self {
        self.bytes[ACK] = ack;
        self.bytes[REPLY_SUBCOMMAND] = subcommand;
        let len = data.len().min(REPORT_LENGTH - REPLY_DATA);
        self.bytes[REPLY_DATA..REPLY_DATA + len].copy_from_slice(&data[..len]);
        self
    }

    /// Three identical samples fill the IMU block.
    pub fn set_imu(&mut self, sample: [u8; 12]) -> &mut Self {
        for chunk in self.bytes[IMU..IMU + 36].chunks_exact_mut(12) {
            chunk.copy_from_slice(&sample);
        }
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

/// Button and raw stick bytes read back out of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportInput {
    pub report_id: u8,
    pub buttons: Buttons,
    pub left_stick: [u8; 3],
    pub right_stick: [u8; 3],
}

pub fn decode_input(report: &[u8]) -> Option<ReportInput> {
    if report.len() < RIGHT_STICK + 3 || report[0] != INPUT_HEADER {
        return None;
    }
    let three = |at: usize| [report[at], report[at + 1], report[at + 2]];
    Some(ReportInput {
        report_id: report[REPORT_ID],
        buttons: Buttons::from_report_bytes(three(BUTTONS)),
        left_stick: three(LEFT_STICK),
        right_stick: three(RIGHT_STICK),
    })
}

/// Space separated upper-case hex, formatted lazily.
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// One line summary of a console frame for debug logs.
pub fn describe_console_message(bytes: &[u8]) -> String {
    match ConsoleCommand::parse(bytes) {
        Some(command) => match command.subcommand {
            Some(subcommand) => format!(
                "[console] #{:03} subcommand {} | {}",
                command.counter,
                subcommand,
                Hex(bytes)
            ),
            None => format!(
                "[console] #{:03} report 0x{:02X} | {}",
                command.counter,
                command.report_id,
                Hex(bytes)
            ),
        },
        None => format!("[console] unrecognised | {}", Hex(bytes)),
    }
}

/// One line summary of an outgoing report for debug logs.
pub fn describe_controller_message(bytes: &[u8]) -> String {
    match bytes.get(REPORT_ID) {
        Some(&SUBCOMMAND_REPLY) if bytes.len() > REPLY_SUBCOMMAND => format!(
            "[controller] reply ack 0x{:02X} to 0x{:02X} | {}",
            bytes[ACK],
            bytes[REPLY_SUBCOMMAND],
            Hex(bytes)
        ),
        Some(&FULL_INPUT_REPORT) => format!("[controller] full input | {}", Hex(bytes)),
        _ => format!("[controller] idle | {}", Hex(bytes)),
    }
}
