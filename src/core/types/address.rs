//! Target-process address wrapper with hex parsing

use super::error::{MemoryAccessError, MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address inside the attached process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub usize);

impl Address {
    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Adds a byte count, returning `None` on overflow
    pub fn checked_add(&self, bytes: usize) -> Option<Self> {
        self.0.checked_add(bytes).map(Address)
    }

    /// Subtracts a byte count, returning `None` on underflow
    pub fn checked_sub(&self, bytes: usize) -> Option<Self> {
        self.0.checked_sub(bytes).map(Address)
    }

    /// Distance in bytes from `base` up to this address
    pub fn offset_from(&self, base: Address) -> Option<usize> {
        self.0.checked_sub(base.0)
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            usize::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            usize::from_str_radix(s, 16)
        } else {
            s.parse::<usize>()
        };

        value.map(Address::new).map_err(|_| {
            MemoryAccessError::InvalidAddress {
                address: Address::null(),
            }
            .into()
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value)
    }
}

impl From<Address> for usize {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Parses an address, accepting `0x`-prefixed hex or plain decimal
pub fn parse_address(s: &str) -> MemoryResult<Address> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        assert_eq!(Address::from_str("0x1000").unwrap(), Address::new(0x1000));
        assert_eq!(Address::from_str("0X1000").unwrap(), Address::new(0x1000));
        assert_eq!(
            Address::from_str("DEADBEEF").unwrap(),
            Address::new(0xDEADBEEF)
        );
        assert_eq!(Address::from_str("4096").unwrap(), Address::new(4096));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let addr = Address::new(0x1000);
        assert_eq!(addr.checked_add(0x10), Some(Address::new(0x1010)));
        assert_eq!(addr.checked_sub(0x10), Some(Address::new(0x0FF0)));
        assert_eq!(Address::new(4).checked_sub(8), None);
        assert_eq!(Address::new(usize::MAX).checked_add(1), None);
        assert_eq!(Address::new(0x1010).offset_from(addr), Some(0x10));
    }

    #[test]
    fn test_address_display() {
        let addr = Address::new(0xDEADBEEF);
        assert_eq!(format!("{}", addr), "0x00000000DEADBEEF");
        assert_eq!(format!("{:x}", addr), "0xdeadbeef");
    }

    #[test]
    fn test_address_serializes_as_number() {
        let json = serde_json::to_string(&Address::new(4096)).unwrap();
        assert_eq!(json, "4096");
        let back: Address = serde_json::from_str("4096").unwrap();
        assert_eq!(back, Address::new(4096));
    }
}
