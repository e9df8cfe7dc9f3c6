//! Bluetooth device addresses.
//!
//! Addresses are kept in display order (`AA:BB:CC:DD:EE:FF`, most significant
//! byte first). The kernel and the HID device-info reply want different byte
//! orders, so conversions are explicit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must have 6 colon separated octets: {0}")]
    OctetCount(String),

    #[error("Invalid octet `{octet}` in address {address}")]
    InvalidOctet { address: String, octet: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Wildcard address (`BDADDR_ANY`), used when binding to the exact
    /// adapter address fails.
    pub const ANY: BdAddr = BdAddr([0; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Octets in display order.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Octets in the little-endian order used by `bdaddr_t`.
    pub fn to_kernel_order(&self) -> [u8; 6] {
        let mut octets = self.0;
        octets.reverse();
        octets
    }

    pub fn from_kernel_order(mut octets: [u8; 6]) -> Self {
        octets.reverse();
        Self(octets)
    }

    pub fn is_any(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl FromStr for BdAddr {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(AddressError::OctetCount(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(AddressError::InvalidOctet {
                    address: s.to_string(),
                    octet: part.to_string(),
                });
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| AddressError::InvalidOctet {
                address: s.to_string(),
                octet: part.to_string(),
            })?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for BdAddr {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BdAddr> for String {
    fn from(value: BdAddr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_uppercase() {
        let addr: BdAddr = "98:b6:e9:46:50:6a".parse().unwrap();
        assert_eq!(addr.octets(), [0x98, 0xB6, 0xE9, 0x46, 0x50, 0x6A]);
        assert_eq!(addr.to_string(), "98:B6:E9:46:50:6A");
    }

    #[test]
    fn kernel_order_is_reversed() {
        let addr = BdAddr::new([1, 2, 3, 4, 5, 6]);
        assert_eq!(addr.to_kernel_order(), [6, 5, 4, 3, 2, 1]);
        assert_eq!(BdAddr::from_kernel_order(addr.to_kernel_order()), addr);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(matches!(
            "00:11:22:33:44".parse::<BdAddr>(),
            Err(AddressError::OctetCount(_))
        ));
        assert!(matches!(
            "00:11:22:33:44:GG".parse::<BdAddr>(),
            Err(AddressError::InvalidOctet { .. })
        ));
        assert!(matches!(
            "00:11:22:33:44:555".parse::<BdAddr>(),
            Err(AddressError::InvalidOctet { .. })
        ));
    }

    #[test]
    fn wildcard_is_all_zero() {
        assert!(BdAddr::ANY.is_any());
        assert_eq!(BdAddr::ANY.to_string(), "00:00:00:00:00:00");
    }
}
