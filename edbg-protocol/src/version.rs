//! Three part version numbers

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Protocol or application version (`major.minor.patch`)
///
/// On the wire a version takes four bytes: major, minor and a little-endian
/// 16-bit patch number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u16,
}

/// Encoded size of a version
pub const VERSION_SIZE: usize = 4;

impl Version {
    /// Create a new version
    pub const fn new(major: u8, minor: u8, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Decode from the four byte wire format
    pub fn from_bytes(bytes: [u8; VERSION_SIZE]) -> Self {
        Self {
            major: bytes[0],
            minor: bytes[1],
            patch: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    /// Encode to the four byte wire format
    pub fn to_bytes(self) -> [u8; VERSION_SIZE] {
        let [lo, hi] = self.patch.to_le_bytes();
        [self.major, self.minor, lo, hi]
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bytes() {
        let version = Version::new(0, 1, 2000);
        assert_eq!(version.to_bytes(), [0, 1, 0xD0, 0x07]);
        assert_eq!(Version::from_bytes([0, 1, 0xD0, 0x07]), version);
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::new(0, 6, 9) < Version::new(0, 7, 0));
        assert!(Version::new(0, 8, 0) < Version::new(1, 0, 0));
        assert!(Version::new(0, 7, 1000) < Version::new(0, 8, 0));
    }
}
