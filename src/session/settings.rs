use std::time::Duration;

/// Timing of the pairing loop and the reconnect policy. The steady state
/// cadence is not configurable; it follows from the controller type.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub pairing_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            // The console answers slowly while pairing, 15 Hz works best.
            pairing_interval: Duration::from_nanos(1_000_000_000 / 15),
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_attempts: 2,
        }
    }
}
