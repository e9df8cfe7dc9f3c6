use crate::transport::BdAddr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Every supported controller sends 50 byte reports, header included.
pub const REPORT_LENGTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerType {
    JoyConLeft,
    JoyConRight,
    ProController,
}

impl ControllerType {
    /// Device type byte reported in the device info reply.
    pub const fn device_id(self) -> u8 {
        match self {
            ControllerType::JoyConLeft => 0x01,
            ControllerType::JoyConRight => 0x02,
            ControllerType::ProController => 0x03,
        }
    }

    /// Lower nibble of the battery/connection byte.
    pub const fn connection_info(self) -> u8 {
        match self {
            ControllerType::ProController => 0x00,
            ControllerType::JoyConLeft | ControllerType::JoyConRight => 0x0E,
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            ControllerType::JoyConLeft => "Joy-Con (L)",
            ControllerType::JoyConRight => "Joy-Con (R)",
            ControllerType::ProController => "Pro Controller",
        }
    }

    pub const fn report_length(self) -> usize {
        REPORT_LENGTH
    }

    /// Steady state report cadence: 120 Hz for the Pro Controller, 60 Hz for Joy-Cons.
    pub const fn report_interval(self) -> Duration {
        match self {
            ControllerType::ProController => Duration::from_nanos(1_000_000_000 / 120),
            ControllerType::JoyConLeft | ControllerType::JoyConRight => {
                Duration::from_nanos(1_000_000_000 / 60)
            }
        }
    }

    pub const fn has_left_stick(self) -> bool {
        !matches!(self, ControllerType::JoyConRight)
    }

    pub const fn has_right_stick(self) -> bool {
        !matches!(self, ControllerType::JoyConLeft)
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid colour `{0}`, expected #RRGGBB")]
pub struct ColorError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const DEFAULT_BODY: Color = Color::new(0x82, 0x82, 0x82);
    pub const DEFAULT_BUTTONS: Color = Color::new(0x0F, 0x0F, 0x0F);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorError(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorError(s.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Who the emulated controller claims to be. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerIdentity {
    pub controller_type: ControllerType,
    pub body_color: Color,
    pub button_color: Color,
    pub adapter_address: BdAddr,
}

impl ControllerIdentity {
    pub fn new(
        controller_type: ControllerType,
        body_color: Option<Color>,
        button_color: Option<Color>,
        adapter_address: BdAddr,
    ) -> Self {
        Self {
            controller_type,
            body_color: body_color.unwrap_or(Color::DEFAULT_BODY),
            button_color: button_color.unwrap_or(Color::DEFAULT_BUTTONS),
            adapter_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        assert_eq!(ControllerType::JoyConLeft.device_id(), 0x01);
        assert_eq!(ControllerType::JoyConRight.device_id(), 0x02);
        assert_eq!(ControllerType::ProController.device_id(), 0x03);

        assert_eq!(ControllerType::ProController.connection_info(), 0x00);
        assert_eq!(ControllerType::JoyConLeft.connection_info(), 0x0E);

        assert!(!ControllerType::JoyConRight.has_left_stick());
        assert!(!ControllerType::JoyConLeft.has_right_stick());
        assert!(ControllerType::ProController.has_left_stick());
        assert!(ControllerType::ProController.has_right_stick());
    }

    #[test]
    fn pro_controller_reports_twice_as_often() {
        let pro = ControllerType::ProController.report_interval();
        let joycon = ControllerType::JoyConLeft.report_interval();
        assert_eq!(pro.as_micros(), 8_333);
        assert_eq!(joycon.as_micros(), 16_666);
    }

    #[test]
    fn colours_parse_with_or_without_hash() {
        assert_eq!("#82820F".parse::<Color>(), Ok(Color::new(0x82, 0x82, 0x0F)));
        assert_eq!("0a0B0c".parse::<Color>(), Ok(Color::new(0x0A, 0x0B, 0x0C)));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GG0000".parse::<Color>().is_err());
        assert_eq!(Color::DEFAULT_BODY.to_string(), "#828282");
    }

    #[test]
    fn identity_falls_back_to_default_colours() {
        let identity =
            ControllerIdentity::new(ControllerType::ProController, None, None, BdAddr::ANY);
        assert_eq!(identity.body_color, Color::DEFAULT_BODY);
        assert_eq!(identity.button_color, Color::DEFAULT_BUTTONS);
    }
}
