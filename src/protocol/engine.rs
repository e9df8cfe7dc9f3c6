//! Protocol engine: answers console subcommands and builds the next report.
//!
//! Protocol state is mutated only by [`ControllerProtocol::process_commands`]
//! and drained by [`ControllerProtocol::get_report`]. Building a report
//! consumes the pending reply, so asking twice in a row yields the idle report
//! the second time and never repeats an acknowledgement.
//!
//! ```text
//! console frame ──► process_commands ──► PendingReport ──► get_report ──► bytes
//!                                             ▲
//!                       set_input_frame ──────┘
//! ```

use crate::controller::{ControllerIdentity, LEFT_STICK, RIGHT_STICK};
use crate::input::InputFrame;
use crate::protocol::command::{ConsoleCommand, Subcommand};
use crate::protocol::report::{
    describe_console_message, InputReport, FULL_INPUT_REPORT, SUBCOMMAND_REPLY,
};
use crate::protocol::spi::{SpiFlash, MAX_READ_LENGTH};
use std::time::Instant;
use tracing::{debug, info, trace};

const ACK_GENERIC: u8 = 0x80;
const ACK_DEVICE_INFO: u8 = 0x82;
const ACK_TRIGGER_ELAPSED: u8 = 0x83;
const ACK_SPI_READ: u8 = 0x90;
const ACK_NFC_IR_CONFIG: u8 = 0xA0;

const FIRMWARE_VERSION: [u8; 2] = [0x03, 0x8B];
const NFC_IR_CONFIG_REPLY: [u8; 8] = [0x01, 0x00, 0xFF, 0x00, 0x08, 0x00, 0x1B, 0x01];
const NFC_IR_CONFIG_CRC: u8 = 0xC8;

const VIBRATOR_IDLE: u8 = 0x80;
const VIBRATOR_PATTERN: [u8; 4] = [0xA0, 0xB0, 0xC0, 0x90];

/// Console frames shorter than this are not worth a hex dump.
const LOG_THRESHOLD: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingReport {
    Idle,
    FullInput,
    Reply {
        ack: u8,
        subcommand: u8,
        data: Vec<u8>,
    },
}

#[derive(Debug)]
pub struct ControllerProtocol {
    identity: ControllerIdentity,
    spi: SpiFlash,
    pending: PendingReport,
    input: InputFrame,
    timer: u8,
    last_timer_update: Option<Instant>,
    report_mode: Option<u8>,
    player: Option<u8>,
    imu_enabled: bool,
    vibration_enabled: bool,
    vibrator_step: usize,
    device_info_queried: bool,
}

impl ControllerProtocol {
    pub fn new(identity: ControllerIdentity) -> Self {
        debug!(
            "Creating protocol engine for {} ({})",
            identity.controller_type, identity.adapter_address
        );
        let spi = SpiFlash::new(&identity);
        Self {
            identity,
            spi,
            pending: PendingReport::Idle,
            input: InputFrame::neutral(),
            timer: 0,
            last_timer_update: None,
            report_mode: None,
            player: None,
            imu_enabled: false,
            vibration_enabled: false,
            vibrator_step: 0,
            device_info_queried: false,
        }
    }

    pub fn identity(&self) -> &ControllerIdentity {
        &self.identity
    }

    /// Player number (1-4) from the last player lights subcommand.
    pub fn player(&self) -> Option<u8> {
        self.player
    }

    pub fn report_mode(&self) -> Option<u8> {
        self.report_mode
    }

    pub fn imu_enabled(&self) -> bool {
        self.imu_enabled
    }

    pub fn vibration_enabled(&self) -> bool {
        self.vibration_enabled
    }

    pub fn device_info_queried(&self) -> bool {
        self.device_info_queried
    }

    pub fn input_frame(&self) -> &InputFrame {
        &self.input
    }

    pub fn set_input_frame(&mut self, frame: InputFrame) {
        self.input = frame;
    }

    /// Ingests zero or one console frame. With nothing received, or nothing
    /// that needs an answer, the next report is a plain full input report.
    pub fn process_commands(&mut self, reply: Option<&[u8]>) {
        let Some(bytes) = reply else {
            self.pending = PendingReport::FullInput;
            return;
        };

        if bytes.len() > LOG_THRESHOLD {
            debug!("{}", describe_console_message(bytes));
        }

        let Some(command) = ConsoleCommand::parse(bytes) else {
            trace!("Ignoring unrecognised frame of {} bytes", bytes.len());
            self.pending = PendingReport::FullInput;
            return;
        };

        self.pending = match command.subcommand {
            Some(subcommand) => self.answer(subcommand, command.args),
            None => PendingReport::FullInput,
        };
    }

    fn answer(&mut self, subcommand: Subcommand, args: &[u8]) -> PendingReport {
        let reply = |ack: u8, data: Vec<u8>| PendingReport::Reply {
            ack,
            subcommand: subcommand.id(),
            data,
        };

        match subcommand {
            Subcommand::DeviceInfo => {
                self.device_info_queried = true;
                reply(ACK_DEVICE_INFO, self.device_info())
            }
            Subcommand::SetShipmentState => reply(ACK_GENERIC, Vec::new()),
            Subcommand::SpiRead => match self.spi_read(args) {
                Some(data) => reply(ACK_SPI_READ, data),
                None => {
                    debug!("SPI read with truncated arguments, sending input instead");
                    PendingReport::FullInput
                }
            },
            Subcommand::SetInputMode => {
                self.report_mode = args.first().copied();
                debug!("Input report mode set to {:?}", self.report_mode);
                reply(ACK_GENERIC, Vec::new())
            }
            Subcommand::TriggerButtonsElapsed => reply(ACK_TRIGGER_ELAPSED, Vec::new()),
            Subcommand::EnableImu => {
                self.imu_enabled = args.first() == Some(&0x01);
                debug!("IMU enabled: {}", self.imu_enabled);
                reply(ACK_GENERIC, Vec::new())
            }
            Subcommand::EnableVibration => {
                self.vibration_enabled = args.first().map_or(true, |arg| *arg == 0x01);
                debug!("Vibration enabled: {}", self.vibration_enabled);
                reply(ACK_GENERIC, Vec::new())
            }
            Subcommand::SetPlayerLights => {
                self.player = args.first().and_then(|lights| player_from_lights(*lights));
                info!("Console assigned player {:?}", self.player);
                reply(ACK_GENERIC, Vec::new())
            }
            Subcommand::SetNfcIrState => reply(ACK_GENERIC, Vec::new()),
            Subcommand::SetNfcIrConfig => {
                let mut data = vec![0u8; 34];
                data[..NFC_IR_CONFIG_REPLY.len()].copy_from_slice(&NFC_IR_CONFIG_REPLY);
                data[33] = NFC_IR_CONFIG_CRC;
                reply(ACK_NFC_IR_CONFIG, data)
            }
            Subcommand::SetHomeLight | Subcommand::SetImuSensitivity => {
                reply(ACK_GENERIC, Vec::new())
            }
            Subcommand::Unknown(id) => {
                debug!("Unknown subcommand 0x{:02X}, sending input instead", id);
                PendingReport::FullInput
            }
        }
    }

    fn device_info(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&FIRMWARE_VERSION);
        data.push(self.identity.controller_type.device_id());
        data.push(0x02);
        data.extend_from_slice(&self.identity.adapter_address.octets());
        data.push(0x01);
        // Colours are stored in SPI flash.
        data.push(0x01);
        data
    }

    fn spi_read(&self, args: &[u8]) -> Option<Vec<u8>> {
        let address_bytes: [u8; 4] = args.get(..4)?.try_into().ok()?;
        let length = (*args.get(4)?).min(MAX_READ_LENGTH);
        let address = u32::from_le_bytes(address_bytes);

        let mut data = Vec::with_capacity(5 + length as usize);
        data.extend_from_slice(&address_bytes);
        data.push(length);
        data.extend(self.spi.read(address, length));
        Some(data)
    }

    fn advance_timer(&mut self) -> u8 {
        let now = Instant::now();
        match self.last_timer_update {
            None => self.timer = 0,
            Some(previous) => {
                // One tick is roughly 5 ms.
                let elapsed_ms = now.duration_since(previous).as_secs_f64() * 1000.0;
                let ticks = (elapsed_ms / 5.0) as u64;
                self.timer = self.timer.wrapping_add((ticks & 0xFF) as u8);
            }
        }
        self.last_timer_update = Some(now);
        self.timer
    }

    fn base_report(&mut self, report_id: u8) -> InputReport {
        let controller_type = self.identity.controller_type;
        let timer = self.advance_timer();

        let left = if controller_type.has_left_stick() {
            LEFT_STICK.encode(self.input.left_stick.x, self.input.left_stick.y)
        } else {
            [0; 3]
        };
        let right = if controller_type.has_right_stick() {
            RIGHT_STICK.encode(self.input.right_stick.x, self.input.right_stick.y)
        } else {
            [0; 3]
        };

        let mut report = InputReport::neutral();
        report
            .set_report_id(report_id)
            .set_timer(timer)
            .set_battery(controller_type.connection_info())
            .set_buttons(self.input.buttons)
            .set_left_stick(left)
            .set_right_stick(right)
            .set_vibrator(VIBRATOR_IDLE);
        report
    }

    fn next_vibrator(&mut self) -> u8 {
        if !self.vibration_enabled {
            return VIBRATOR_IDLE;
        }
        let value = VIBRATOR_PATTERN[self.vibrator_step % VIBRATOR_PATTERN.len()];
        self.vibrator_step = self.vibrator_step.wrapping_add(1);
        value
    }

    /// Produces the next outgoing report and resets the engine to idle.
    pub fn get_report(&mut self) -> Vec<u8> {
        let report = match std::mem::replace(&mut self.pending, PendingReport::Idle) {
            PendingReport::Idle => InputReport::neutral(),
            PendingReport::FullInput => {
                let mut report = self.base_report(FULL_INPUT_REPORT);
                if self.imu_enabled {
                    report.set_imu(self.input.imu.unwrap_or_default().to_bytes());
                }
                report
            }
            PendingReport::Reply {
                ack,
                subcommand,
                data,
            } => {
                let vibrator = self.next_vibrator();
                let mut report = self.base_report(SUBCOMMAND_REPLY);
                report.set_vibrator(vibrator).set_reply(ack, subcommand, &data);
                report
            }
        };
        report.into_vec()
    }
}

/// Player lights bitfield to player number. Flashing lights (upper nibble)
/// count like solid ones.
fn player_from_lights(lights: u8) -> Option<u8> {
    let solid = (lights | (lights >> 4)) & 0x0F;
    match solid.count_ones() {
        0 => None,
        n => Some(n as u8),
    }
}
