//! Fixed-size unsigned values and their little-endian encoding

use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the values being scanned, watched or written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum ValueSize {
    U8,
    U16,
    #[default]
    U32,
}

impl ValueSize {
    /// Number of bytes occupied in memory
    pub const fn bytes(self) -> usize {
        match self {
            ValueSize::U8 => 1,
            ValueSize::U16 => 2,
            ValueSize::U32 => 4,
        }
    }

    /// Largest value representable at this width
    pub const fn max_value(self) -> u32 {
        match self {
            ValueSize::U8 => u8::MAX as u32,
            ValueSize::U16 => u16::MAX as u32,
            ValueSize::U32 => u32::MAX,
        }
    }

    /// Checks that `value` fits, returning it narrowed to `u32`
    pub fn check(self, value: u64) -> Result<u32, ValidationError> {
        if value > self.max_value() as u64 {
            return Err(ValidationError::BadRange {
                value,
                size: self.bytes(),
            });
        }
        Ok(value as u32)
    }

    /// Little-endian encoding; only the first `bytes()` bytes are meaningful
    pub fn encode(self, value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }

    /// Decodes the first `bytes()` bytes of `data` as little-endian
    ///
    /// Returns `None` when `data` is shorter than the width.
    pub fn decode(self, data: &[u8]) -> Option<u32> {
        let width = self.bytes();
        let bytes = data.get(..width)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(bytes);
        Some(u32::from_le_bytes(buf))
    }
}

impl TryFrom<usize> for ValueSize {
    type Error = ValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ValueSize::U8),
            2 => Ok(ValueSize::U16),
            4 => Ok(ValueSize::U32),
            other => Err(ValidationError::BadSize(other)),
        }
    }
}

impl From<ValueSize> for usize {
    fn from(value: ValueSize) -> Self {
        value.bytes()
    }
}

impl fmt::Display for ValueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} byte(s)", self.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_conversion() {
        assert_eq!(ValueSize::try_from(1).unwrap(), ValueSize::U8);
        assert_eq!(ValueSize::try_from(2).unwrap(), ValueSize::U16);
        assert_eq!(ValueSize::try_from(4).unwrap(), ValueSize::U32);
        assert_eq!(ValueSize::try_from(3), Err(ValidationError::BadSize(3)));
        assert_eq!(ValueSize::try_from(8), Err(ValidationError::BadSize(8)));
        assert_eq!(usize::from(ValueSize::U16), 2);
    }

    #[test]
    fn test_range_check() {
        assert_eq!(ValueSize::U8.check(255), Ok(255));
        assert_eq!(
            ValueSize::U8.check(256),
            Err(ValidationError::BadRange { value: 256, size: 1 })
        );
        assert_eq!(ValueSize::U16.check(65535), Ok(65535));
        assert!(ValueSize::U32.check(u32::MAX as u64 + 1).is_err());
    }

    #[test]
    fn test_little_endian_decode() {
        let data = [0x64, 0x00, 0x01, 0x00];
        assert_eq!(ValueSize::U8.decode(&data), Some(100));
        assert_eq!(ValueSize::U16.decode(&data), Some(100));
        assert_eq!(ValueSize::U32.decode(&data), Some(0x0001_0064));
        assert_eq!(ValueSize::U32.decode(&data[..3]), None);
        assert_eq!(&ValueSize::U16.encode(0x1234)[..2], &[0x34, 0x12]);
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&ValueSize::U16).unwrap(), "2");
        let size: ValueSize = serde_json::from_str("4").unwrap();
        assert_eq!(size, ValueSize::U32);
        assert!(serde_json::from_str::<ValueSize>("3").is_err());
    }
}
