//! The open connection to the attached process

use super::access::{OpenedProcess, ProcessMemory};
use crate::core::types::{
    Address, MemoryResult, ProcessAccessError, ProcessId, ProcessInfo, ValueSize,
};
use crate::memory::regions::RegionMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Owns the backend for one attached process; all memory I/O flows through it
///
/// Shared as `Arc<TargetHandle>` between the engine and watch pollers.
/// Closing the handle makes every later operation fail with
/// [`ProcessAccessError::NotAttached`], which is also how pollers notice a
/// detach.
pub struct TargetHandle {
    info: ProcessInfo,
    memory: Box<dyn ProcessMemory>,
    regions: RwLock<Arc<RegionMap>>,
    open: AtomicBool,
    // Serializes sized reads against writes so a value is never observed half-written.
    io_lock: Mutex<()>,
}

impl TargetHandle {
    /// Wraps an opened process and takes the first region snapshot
    pub fn new(opened: OpenedProcess) -> MemoryResult<Self> {
        let regions = RegionMap::from_regions(opened.memory.regions()?);
        debug!(
            pid = opened.info.pid,
            regions = regions.len(),
            "enumerated target regions"
        );
        Ok(TargetHandle {
            info: opened.info,
            memory: opened.memory,
            regions: RwLock::new(Arc::new(regions)),
            open: AtomicBool::new(true),
            io_lock: Mutex::new(()),
        })
    }

    /// Get the process ID
    pub fn pid(&self) -> ProcessId {
        self.info.pid
    }

    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    /// Open and the process still running
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && self.memory.is_alive()
    }

    /// Marks the handle closed; idempotent
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(pid = self.info.pid, "target handle closed");
        }
    }

    fn ensure_open(&self) -> MemoryResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ProcessAccessError::NotAttached.into())
        }
    }

    /// Current region snapshot
    pub fn regions(&self) -> Arc<RegionMap> {
        Arc::clone(&self.regions.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-enumerates the memory map, returning the new snapshot
    pub fn refresh_regions(&self) -> MemoryResult<Arc<RegionMap>> {
        self.ensure_open()?;
        let fresh = Arc::new(RegionMap::from_regions(self.memory.regions()?));
        debug!(pid = self.info.pid, regions = fresh.len(), "refreshed regions");
        *self.regions.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        Ok(fresh)
    }

    /// Bulk read used by region scans
    pub fn read_bytes(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        self.ensure_open()?;
        self.memory.read(address, buffer)
    }

    /// Reads one little-endian value
    pub fn read_value(&self, address: Address, size: ValueSize) -> MemoryResult<u32> {
        self.ensure_open()?;
        let mut buffer = [0u8; 4];
        let width = size.bytes();
        {
            let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.memory.read(address, &mut buffer[..width])?;
        }
        Ok(u32::from_le_bytes(buffer))
    }

    /// Writes one little-endian value; `value` is truncated to `size`
    pub fn write_value(&self, address: Address, size: ValueSize, value: u32) -> MemoryResult<()> {
        self.ensure_open()?;
        let encoded = size.encode(value);
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.memory.write(address, &encoded[..size.bytes()])
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandle")
            .field("pid", &self.info.pid)
            .field("name", &self.info.name)
            .field("open", &self.open.load(Ordering::Relaxed))
            .finish()
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TargetHandle(pid={}, open={})",
            self.info.pid,
            self.is_open()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MemoryError;
    use crate::process::simulated::SimulatedProcess;

    fn handle_with(process: &Arc<SimulatedProcess>) -> TargetHandle {
        TargetHandle::new(OpenedProcess {
            info: ProcessInfo::new(1234, "sim"),
            memory: Box::new(Arc::clone(process)),
        })
        .unwrap()
    }

    #[test]
    fn test_read_write_value() {
        let process = Arc::new(SimulatedProcess::new());
        process.map(0x1000, 0x100, true, true);
        let handle = handle_with(&process);

        handle
            .write_value(Address::new(0x1010), ValueSize::U16, 0xBEEF)
            .unwrap();
        assert_eq!(
            handle.read_value(Address::new(0x1010), ValueSize::U16).unwrap(),
            0xBEEF
        );
        assert_eq!(process.peek(0x1010, 3).unwrap(), vec![0xEF, 0xBE, 0x00]);
    }

    #[test]
    fn test_closed_handle_rejects_io() {
        let process = Arc::new(SimulatedProcess::new());
        process.map(0x1000, 0x100, true, true);
        let handle = handle_with(&process);
        handle.close();

        assert!(!handle.is_open());
        let err = handle
            .read_value(Address::new(0x1000), ValueSize::U8)
            .unwrap_err();
        assert!(matches!(
            err,
            MemoryError::Process(ProcessAccessError::NotAttached)
        ));
        assert!(handle
            .write_value(Address::new(0x1000), ValueSize::U8, 1)
            .is_err());
        assert_eq!(process.peek_value(0x1000, ValueSize::U8), Some(0));
    }

    #[test]
    fn test_exited_process_is_not_open() {
        let process = Arc::new(SimulatedProcess::new());
        let handle = handle_with(&process);
        assert!(handle.is_open());
        process.terminate();
        assert!(!handle.is_open());
    }

    #[test]
    fn test_refresh_regions() {
        let process = Arc::new(SimulatedProcess::new());
        process.map(0x1000, 0x100, true, true);
        let handle = handle_with(&process);
        assert_eq!(handle.regions().len(), 1);

        process.map(0x4000, 0x100, true, false);
        assert_eq!(handle.regions().len(), 1);
        assert_eq!(handle.refresh_regions().unwrap().len(), 2);
        assert_eq!(handle.regions().len(), 2);
    }

    #[test]
    fn test_display() {
        let process = Arc::new(SimulatedProcess::new());
        let handle = handle_with(&process);
        assert_eq!(handle.to_string(), "TargetHandle(pid=1234, open=true)");
    }
}
