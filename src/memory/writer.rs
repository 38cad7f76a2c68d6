//! Validated writes into the attached process

use crate::core::types::{Address, MemoryAccessError, MemoryResult, Region, ValueSize};
use crate::process::TargetHandle;
use tracing::{debug, info};

/// Values written by [`MemoryWriter::bhop`]: "in air" then "on ground"
pub const BHOP_SEQUENCE: [u32; 2] = [256, 257];

/// Writes values after checking the destination against the region map
pub struct MemoryWriter<'a> {
    target: &'a TargetHandle,
}

impl<'a> MemoryWriter<'a> {
    pub fn new(target: &'a TargetHandle) -> Self {
        MemoryWriter { target }
    }

    /// Finds the region that must hold `[address, address + size)`
    ///
    /// A miss refreshes the map once before giving up, so freshly mapped
    /// memory is writable without a manual refresh.
    fn destination(&self, address: Address, size: ValueSize) -> MemoryResult<Region> {
        let lookup = |target: &TargetHandle| target.regions().find(address).cloned();
        let region = match lookup(self.target) {
            Some(region) => region,
            None => {
                debug!(address = %address, "address not in region map; refreshing");
                self.target
                    .refresh_regions()?
                    .find(address)
                    .cloned()
                    .ok_or(MemoryAccessError::InvalidAddress { address })?
            }
        };

        if !region.contains_span(address, size.bytes()) {
            return Err(MemoryAccessError::InvalidAddress { address }.into());
        }
        if !region.writable {
            return Err(MemoryAccessError::WriteProtected { address }.into());
        }
        Ok(region)
    }

    /// Checks that `size` bytes at `address` may be written
    pub fn check_writable(&self, address: Address, size: ValueSize) -> MemoryResult<()> {
        self.destination(address, size).map(|_| ())
    }

    /// Writes `value` as `size` little-endian bytes
    pub fn write(&self, address: Address, size: ValueSize, value: u32) -> MemoryResult<()> {
        self.check_writable(address, size)?;
        self.target.write_value(address, size, value)?;
        debug!(address = %address, size = size.bytes(), value, "wrote value");
        Ok(())
    }

    /// Writes [`BHOP_SEQUENCE`] in order, truncating each value to `size`
    pub fn bhop(&self, address: Address, size: ValueSize) -> MemoryResult<()> {
        self.check_writable(address, size)?;
        for value in BHOP_SEQUENCE {
            self.target.write_value(address, size, value)?;
        }
        info!(address = %address, size = size.bytes(), "bhop sequence written");
        Ok(())
    }
}
