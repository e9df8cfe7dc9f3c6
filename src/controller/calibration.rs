//! Analog stick calibration and 12-bit coordinate packing.
//!
//! Stick input is expressed as a percentage per axis (-100..=100). On the wire
//! each axis is a 12-bit value relative to the factory centre, scaled by the
//! factory range above or below it. Two axes share three bytes:
//!
//! ```text
//! byte0 = x[7:0]
//! byte1 = x[11:8] | y[3:0] << 4
//! byte2 = y[11:4]
//! ```

/// Factory calibration for one stick, in raw 12-bit units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickCalibration {
    pub center: (u16, u16),
    pub max_above_center: (u16, u16),
    pub max_below_center: (u16, u16),
}

pub const LEFT_STICK: StickCalibration = StickCalibration {
    center: (0x86F, 0x77C),
    max_above_center: (1466, 1583),
    max_below_center: (1517, 1465),
};

pub const RIGHT_STICK: StickCalibration = StickCalibration {
    center: (0x816, 0x7DD),
    max_above_center: (1414, 1510),
    max_below_center: (1522, 1531),
};

/// Packs two 12-bit axis values into the three byte stick layout.
pub fn pack_axes(x: u16, y: u16) -> [u8; 3] {
    [
        (x & 0xFF) as u8,
        (((x >> 8) & 0x0F) | ((y & 0x0F) << 4)) as u8,
        ((y >> 4) & 0xFF) as u8,
    ]
}

pub fn unpack_axes(bytes: [u8; 3]) -> (u16, u16) {
    let x = bytes[0] as u16 | ((bytes[1] as u16 & 0x0F) << 8);
    let y = (bytes[1] as u16 >> 4) | ((bytes[2] as u16) << 4);
    (x, y)
}

fn scale(percent: i8, center: u16, above: u16, below: u16) -> u16 {
    let percent = i32::from(percent.clamp(-100, 100));
    let offset = if percent >= 0 {
        percent * i32::from(above) / 100
    } else {
        percent * i32::from(below) / 100
    };
    (i32::from(center) + offset).clamp(0, 0xFFF) as u16
}

fn unscale(raw: u16, center: u16, above: u16, below: u16) -> i8 {
    let delta = i32::from(raw) - i32::from(center);
    let range = if delta >= 0 { above } else { below };
    if range == 0 {
        return 0;
    }
    let percent = (f64::from(delta) * 100.0 / f64::from(range)).round() as i32;
    percent.clamp(-100, 100) as i8
}

impl StickCalibration {
    pub fn encode(&self, x: i8, y: i8) -> [u8; 3] {
        pack_axes(
            scale(x, self.center.0, self.max_above_center.0, self.max_below_center.0),
            scale(y, self.center.1, self.max_above_center.1, self.max_below_center.1),
        )
    }

    pub fn decode(&self, bytes: [u8; 3]) -> (i8, i8) {
        let (x, y) = unpack_axes(bytes);
        (
            unscale(x, self.center.0, self.max_above_center.0, self.max_below_center.0),
            unscale(y, self.center.1, self.max_above_center.1, self.max_below_center.1),
        )
    }

    pub fn centered(&self) -> [u8; 3] {
        pack_axes(self.center.0, self.center.1)
    }
}
