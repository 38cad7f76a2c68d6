//! Memory region descriptor

use super::Address;
use serde::{Deserialize, Serialize};

/// A contiguous span of the target's address space with uniform permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub base: Address,
    pub length: usize,
    pub readable: bool,
    pub writable: bool,
    /// Backing path or pseudo-name (`[heap]`, `[stack]`), when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Region {
    /// Creates a region without a label
    pub fn new(base: Address, length: usize, readable: bool, writable: bool) -> Self {
        Region {
            base,
            length,
            readable,
            writable,
            label: None,
        }
    }

    /// Attaches a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// One past the last address of the region
    pub fn end(&self) -> Address {
        Address::new(self.base.as_usize().saturating_add(self.length))
    }

    /// Check if an address is within this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base && address < self.end()
    }

    /// Check if `[address, address + len)` lies entirely inside this region
    pub fn contains_span(&self, address: Address, len: usize) -> bool {
        match address.checked_add(len) {
            Some(end) => address >= self.base && end <= self.end(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let region = Region::new(Address::new(0x1000), 0x100, true, false);
        assert_eq!(region.end(), Address::new(0x1100));
        assert!(region.contains(Address::new(0x1000)));
        assert!(region.contains(Address::new(0x10FF)));
        assert!(!region.contains(Address::new(0x1100)));
        assert!(!region.contains(Address::new(0x0FFF)));
    }

    #[test]
    fn test_contains_span() {
        let region = Region::new(Address::new(0x1000), 0x100, true, true);
        assert!(region.contains_span(Address::new(0x10FC), 4));
        assert!(!region.contains_span(Address::new(0x10FD), 4));
        assert!(!region.contains_span(Address::new(usize::MAX - 1), 4));
    }

    #[test]
    fn test_label() {
        let region = Region::new(Address::new(0), 1, true, true).with_label("[heap]");
        assert_eq!(region.label.as_deref(), Some("[heap]"));
    }
}
