//! Emulated SPI flash.
//!
//! The console reads calibration and colour data out of the controller's flash
//! during the handshake. Only the regions it actually asks for are populated;
//! everything else reads back as zero.
//!
//! ```text
//! 0x6000  serial number (none)
//! 0x6020  six-axis factory calibration
//! 0x603D  factory stick calibration, left then right
//! 0x6050  body, button and grip colours
//! 0x6080  six-axis horizontal offsets
//! 0x6086  left stick parameters
//! 0x6098  right stick parameters
//! 0x8010  user calibration (absent)
//! ```

use crate::controller::{ControllerIdentity, ControllerType};
use tracing::trace;

/// Largest payload a single SPI read reply can carry.
pub const MAX_READ_LENGTH: u8 = 0x1D;

const SERIAL_NUMBER: u32 = 0x6000;
const IMU_FACTORY_CALIBRATION: u32 = 0x6020;
const STICK_FACTORY_CALIBRATION: u32 = 0x603D;
const COLOURS: u32 = 0x6050;
const IMU_HORIZONTAL_OFFSETS: u32 = 0x6080;
const LEFT_STICK_PARAMETERS: u32 = 0x6086;
const RIGHT_STICK_PARAMETERS: u32 = 0x6098;
const USER_CALIBRATION: u32 = 0x8010;
const USER_CALIBRATION_END: u32 = 0x8040;

const IMU_CALIBRATION: [u8; 24] = [
    0xBE, 0xFF, 0x3E, 0x00, 0xF0, 0x01, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0xFE, 0xFF, 0xFE,
    0xFF, 0x08, 0x00, 0xE7, 0x3B, 0xE7, 0x3B, 0xE7, 0x3B,
];

const LEFT_STICK_CALIBRATION: [u8; 9] = [0xBA, 0xF5, 0x62, 0x6F, 0xC8, 0x77, 0xED, 0x95, 0x5B];
const RIGHT_STICK_CALIBRATION: [u8; 9] = [0x16, 0xD8, 0x7D, 0xF2, 0xB5, 0x5F, 0x86, 0x65, 0x5E];

const HORIZONTAL_OFFSETS: [u8; 6] = [0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F];

const STICK_PARAMETERS: [u8; 18] = [
    0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C,
    0x33, 0x36, 0x63,
];

#[derive(Debug, Clone)]
struct Region {
    start: u32,
    bytes: Vec<u8>,
}

impl Region {
    fn new(start: u32, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    fn byte_at(&self, address: u32) -> Option<u8> {
        let offset = address.checked_sub(self.start)? as usize;
        self.bytes.get(offset).copied()
    }
}

/// Read-only flash image built from the controller identity.
#[derive(Debug, Clone)]
pub struct SpiFlash {
    regions: Vec<Region>,
}

impl SpiFlash {
    pub fn new(identity: &ControllerIdentity) -> Self {
        let mut stick_calibration = Vec::with_capacity(19);
        stick_calibration.extend_from_slice(&LEFT_STICK_CALIBRATION);
        stick_calibration.extend_from_slice(&RIGHT_STICK_CALIBRATION);
        stick_calibration.push(0xFF);

        let mut colours = Vec::with_capacity(12);
        colours.extend_from_slice(&identity.body_color.to_bytes());
        colours.extend_from_slice(&identity.button_color.to_bytes());
        // Grip colours, unset.
        colours.extend_from_slice(&[0xFF; 6]);

        let mut stick_parameters = STICK_PARAMETERS.to_vec();
        if identity.controller_type == ControllerType::ProController {
            stick_parameters[3] = 0x0F;
        }

        let regions = vec![
            Region::new(SERIAL_NUMBER, vec![0xFF; 16]),
            Region::new(IMU_FACTORY_CALIBRATION, IMU_CALIBRATION.to_vec()),
            Region::new(STICK_FACTORY_CALIBRATION, stick_calibration),
            Region::new(COLOURS, colours),
            Region::new(IMU_HORIZONTAL_OFFSETS, HORIZONTAL_OFFSETS.to_vec()),
            Region::new(LEFT_STICK_PARAMETERS, stick_parameters.clone()),
            Region::new(RIGHT_STICK_PARAMETERS, stick_parameters),
            Region::new(
                USER_CALIBRATION,
                vec![0xFF; (USER_CALIBRATION_END - USER_CALIBRATION) as usize],
            ),
        ];

        Self { regions }
    }

    /// Reads `length` bytes starting at `address`, capped at
    /// [`MAX_READ_LENGTH`]. Unmapped bytes read as zero.
    pub fn read(&self, address: u32, length: u8) -> Vec<u8> {
        let length = length.min(MAX_READ_LENGTH);
        trace!("SPI read at 0x{:04X}, {} bytes", address, length);

        (0..u32::from(length))
            .map(|i| {
                let addr = address.wrapping_add(i);
                self.regions
                    .iter()
                    .find_map(|region| region.byte_at(addr))
                    .unwrap_or(0x00)
            })
            .collect()
    }
}
