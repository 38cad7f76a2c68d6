//! Seams between the engine and the operating system
//!
//! [`ProcessMemory`] is the raw I/O surface of one opened process and
//! [`ProcessSource`] is how processes are listed and opened. The platform
//! backends in [`crate::os`] and the in-memory [`super::simulated`] target
//! both implement them.

use crate::core::types::{Address, MemoryResult, ProcessId, ProcessInfo, Region};
use std::sync::Arc;

/// Raw memory access to one opened process
pub trait ProcessMemory: Send + Sync {
    /// Fills `buffer` from `address`; fails without partial results
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Writes all of `data` at `address`
    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()>;

    /// Current memory map, in any order
    fn regions(&self) -> MemoryResult<Vec<Region>>;

    /// False once the process has exited
    fn is_alive(&self) -> bool;
}

impl<T: ProcessMemory + ?Sized> ProcessMemory for Arc<T> {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        (**self).read(address, buffer)
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        (**self).write(address, data)
    }

    fn regions(&self) -> MemoryResult<Vec<Region>> {
        (**self).regions()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

/// A freshly opened process, ready to become the engine's target
pub struct OpenedProcess {
    pub info: ProcessInfo,
    pub memory: Box<dyn ProcessMemory>,
}

impl std::fmt::Debug for OpenedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedProcess")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Lists and opens processes
pub trait ProcessSource: Send + Sync {
    /// Every visible process, in any order
    fn processes(&self) -> MemoryResult<Vec<ProcessInfo>>;

    /// Opens `pid` for reading and writing
    fn open(&self, pid: ProcessId) -> MemoryResult<OpenedProcess>;
}
