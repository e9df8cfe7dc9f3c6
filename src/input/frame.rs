use bitflags::bitflags;

bitflags! {
    /// Button state laid out as the three report bytes, right byte first:
    /// bits 0..8 right side, 8..16 shared, 16..24 left side.
    ///
    /// Flag names double as the button tokens of the macro language.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Buttons: u32 {
        const Y = 0x00_0001;
        const X = 0x00_0002;
        const B = 0x00_0004;
        const A = 0x00_0008;
        const JCR_SR = 0x00_0010;
        const JCR_SL = 0x00_0020;
        const R = 0x00_0040;
        const ZR = 0x00_0080;

        const MINUS = 0x00_0100;
        const PLUS = 0x00_0200;
        const R_STICK_PRESS = 0x00_0400;
        const L_STICK_PRESS = 0x00_0800;
        const HOME = 0x00_1000;
        const CAPTURE = 0x00_2000;

        const DPAD_DOWN = 0x01_0000;
        const DPAD_UP = 0x02_0000;
        const DPAD_RIGHT = 0x04_0000;
        const DPAD_LEFT = 0x08_0000;
        const JCL_SR = 0x10_0000;
        const JCL_SL = 0x20_0000;
        const L = 0x40_0000;
        const ZL = 0x80_0000;
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Buttons::empty()
    }
}

impl Buttons {
    pub fn to_report_bytes(self) -> [u8; 3] {
        let bits = self.bits();
        [
            (bits & 0xFF) as u8,
            ((bits >> 8) & 0xFF) as u8,
            ((bits >> 16) & 0xFF) as u8,
        ]
    }

    pub fn from_report_bytes(bytes: [u8; 3]) -> Self {
        let bits = u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16);
        Buttons::from_bits_truncate(bits)
    }
}

/// Stick deflection per axis, -100..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StickPosition {
    pub x: i8,
    pub y: i8,
}

impl StickPosition {
    pub const CENTER: StickPosition = StickPosition { x: 0, y: 0 };

    pub fn new(x: i8, y: i8) -> Self {
        Self {
            x: x.clamp(-100, 100),
            y: y.clamp(-100, 100),
        }
    }
}

/// One accelerometer + gyroscope sample as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImuSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl ImuSample {
    pub fn to_bytes(self) -> [u8; 12] {
        let mut out = [0u8; 12];
        for (i, value) in self.accel.iter().chain(self.gyro.iter()).enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// Input state encoded into a single outgoing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputFrame {
    pub buttons: Buttons,
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub imu: Option<ImuSample>,
}

impl InputFrame {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn pressing(buttons: Buttons) -> Self {
        Self {
            buttons,
            ..Self::default()
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }
}
