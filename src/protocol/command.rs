//! Parsing of console-originated output reports.
//!
//! ```text
//! [0]      0xA2 (DATA | OUTPUT)
//! [1]      output report id: 0x01 rumble + subcommand, 0x10 rumble only
//! [2]      packet counter
//! [3..11]  rumble data
//! [11]     subcommand id
//! [12..]   subcommand arguments
//! ```

use std::fmt;

pub const OUTPUT_HEADER: u8 = 0xA2;
pub const RUMBLE_AND_SUBCOMMAND: u8 = 0x01;
pub const RUMBLE_ONLY: u8 = 0x10;

pub const SUBCOMMAND_OFFSET: usize = 11;
const RUMBLE_RANGE: std::ops::Range<usize> = 3..11;

/// Subcommand id the console sends once pairing is complete.
pub const PLAYER_LIGHTS_ID: u8 = 0x30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcommand {
    DeviceInfo,
    SetInputMode,
    TriggerButtonsElapsed,
    SetShipmentState,
    SpiRead,
    SetNfcIrConfig,
    SetNfcIrState,
    SetPlayerLights,
    SetHomeLight,
    EnableImu,
    SetImuSensitivity,
    EnableVibration,
    Unknown(u8),
}

impl Subcommand {
    pub fn from_id(id: u8) -> Self {
        match id {
            0x02 => Subcommand::DeviceInfo,
            0x03 => Subcommand::SetInputMode,
            0x04 => Subcommand::TriggerButtonsElapsed,
            0x08 => Subcommand::SetShipmentState,
            0x10 => Subcommand::SpiRead,
            0x21 => Subcommand::SetNfcIrConfig,
            0x22 => Subcommand::SetNfcIrState,
            PLAYER_LIGHTS_ID => Subcommand::SetPlayerLights,
            0x38 => Subcommand::SetHomeLight,
            0x40 => Subcommand::EnableImu,
            0x41 => Subcommand::SetImuSensitivity,
            0x48 => Subcommand::EnableVibration,
            other => Subcommand::Unknown(other),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Subcommand::DeviceInfo => 0x02,
            Subcommand::SetInputMode => 0x03,
            Subcommand::TriggerButtonsElapsed => 0x04,
            Subcommand::SetShipmentState => 0x08,
            Subcommand::SpiRead => 0x10,
            Subcommand::SetNfcIrConfig => 0x21,
            Subcommand::SetNfcIrState => 0x22,
            Subcommand::SetPlayerLights => PLAYER_LIGHTS_ID,
            Subcommand::SetHomeLight => 0x38,
            Subcommand::EnableImu => 0x40,
            Subcommand::SetImuSensitivity => 0x41,
            Subcommand::EnableVibration => 0x48,
            Subcommand::Unknown(id) => id,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Subcommand::DeviceInfo => "device info",
            Subcommand::SetInputMode => "set input mode",
            Subcommand::TriggerButtonsElapsed => "trigger buttons elapsed",
            Subcommand::SetShipmentState => "set shipment state",
            Subcommand::SpiRead => "SPI flash read",
            Subcommand::SetNfcIrConfig => "set NFC/IR config",
            Subcommand::SetNfcIrState => "set NFC/IR state",
            Subcommand::SetPlayerLights => "set player lights",
            Subcommand::SetHomeLight => "set home light",
            Subcommand::EnableImu => "enable IMU",
            Subcommand::SetImuSensitivity => "set IMU sensitivity",
            Subcommand::EnableVibration => "enable vibration",
            Subcommand::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.id(), self.name())
    }
}

/// Borrowed view of one console frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleCommand<'a> {
    pub report_id: u8,
    pub counter: u8,
    pub rumble: &'a [u8],
    pub subcommand: Option<Subcommand>,
    pub args: &'a [u8],
}

impl<'a> ConsoleCommand<'a> {
    /// Returns `None` for frames that are not output reports at all.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < 3 || bytes[0] != OUTPUT_HEADER {
            return None;
        }

        let rumble = bytes.get(RUMBLE_RANGE).unwrap_or(&[]);
        let (subcommand, args) =
            if bytes[1] == RUMBLE_AND_SUBCOMMAND && bytes.len() > SUBCOMMAND_OFFSET {
                (
                    Some(Subcommand::from_id(bytes[SUBCOMMAND_OFFSET])),
                    &bytes[SUBCOMMAND_OFFSET + 1..],
                )
            } else {
                (None, &[][..])
            };

        Some(Self {
            report_id: bytes[1],
            counter: bytes[2],
            rumble,
            subcommand,
            args,
        })
    }
}

/// The console finished pairing once it sets the player lights in a full
/// length frame. Offset and length are fixed by the wire protocol.
pub fn is_pairing_accepted(reply: &[u8]) -> bool {
    reply.len() > 45 && reply[SUBCOMMAND_OFFSET] == PLAYER_LIGHTS_ID
}
