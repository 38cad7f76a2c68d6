//! In-memory processes for exercising the engine without a real target
//!
//! A [`SimulatedProcess`] is a set of byte-backed regions with permissions.
//! Reads and writes obey those permissions exactly like the OS backends do,
//! while [`SimulatedProcess::poke`] mutates memory from "inside" the target,
//! ignoring them. [`SimulatedSystem`] is the matching [`ProcessSource`].

use super::access::{OpenedProcess, ProcessMemory, ProcessSource};
use crate::core::types::{
    Address, MemoryAccessError, MemoryError, MemoryResult, ProcessAccessError, ProcessId,
    ProcessInfo, Region, ValueSize,
};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
struct SimRegion {
    region: Region,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct SimState {
    regions: BTreeMap<usize, SimRegion>,
    alive: bool,
}

impl SimState {
    fn locate(&self, address: Address, len: usize) -> Option<&SimRegion> {
        let (_, candidate) = self.regions.range(..=address.as_usize()).next_back()?;
        candidate
            .region
            .contains_span(address, len)
            .then_some(candidate)
    }

    fn locate_mut(&mut self, address: Address, len: usize) -> Option<&mut SimRegion> {
        let (_, candidate) = self.regions.range_mut(..=address.as_usize()).next_back()?;
        if candidate.region.contains_span(address, len) {
            Some(candidate)
        } else {
            None
        }
    }
}

/// A fake process whose memory lives in this one
#[derive(Debug)]
pub struct SimulatedProcess {
    state: RwLock<SimState>,
}

impl Default for SimulatedProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProcess {
    pub fn new() -> Self {
        SimulatedProcess {
            state: RwLock::new(SimState {
                regions: BTreeMap::new(),
                alive: true,
            }),
        }
    }

    /// Maps a zero-filled region, replacing any region with the same base
    pub fn map(&self, base: usize, length: usize, readable: bool, writable: bool) {
        self.map_region(Region::new(Address::new(base), length, readable, writable));
    }

    pub fn map_region(&self, region: Region) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let bytes = vec![0u8; region.length];
        state
            .regions
            .insert(region.base.as_usize(), SimRegion { region, bytes });
    }

    /// Removes the region starting at `base`
    pub fn unmap(&self, base: usize) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.regions.remove(&base).is_some()
    }

    /// Changes the permissions of the region starting at `base`
    pub fn protect(&self, base: usize, readable: bool, writable: bool) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.regions.get_mut(&base) {
            Some(sim) => {
                sim.region.readable = readable;
                sim.region.writable = writable;
                true
            }
            None => false,
        }
    }

    /// Writes bytes regardless of permissions, as the target itself would
    pub fn poke(&self, address: usize, data: &[u8]) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let address = Address::new(address);
        match state.locate_mut(address, data.len()) {
            Some(sim) => {
                let start = address.as_usize() - sim.region.base.as_usize();
                sim.bytes[start..start + data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Stores a little-endian value regardless of permissions
    pub fn poke_value(&self, address: usize, size: ValueSize, value: u32) -> bool {
        self.poke(address, &size.encode(value)[..size.bytes()])
    }

    /// Reads bytes regardless of permissions
    pub fn peek(&self, address: usize, len: usize) -> Option<Vec<u8>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let address = Address::new(address);
        let sim = state.locate(address, len)?;
        let start = address.as_usize() - sim.region.base.as_usize();
        Some(sim.bytes[start..start + len].to_vec())
    }

    pub fn peek_value(&self, address: usize, size: ValueSize) -> Option<u32> {
        self.peek(address, size.bytes())
            .and_then(|bytes| size.decode(&bytes))
    }

    /// Makes the process exit; every later access fails
    pub fn terminate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.alive = false;
    }
}

impl ProcessMemory for SimulatedProcess {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.alive {
            return Err(MemoryError::unmapped(address));
        }
        let sim = state
            .locate(address, buffer.len())
            .ok_or_else(|| MemoryError::unmapped(address))?;
        if !sim.region.readable {
            return Err(MemoryError::unreadable(address));
        }
        let start = address.as_usize() - sim.region.base.as_usize();
        buffer.copy_from_slice(&sim.bytes[start..start + buffer.len()]);
        Ok(())
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.alive {
            return Err(MemoryError::unmapped(address));
        }
        let sim = state
            .locate_mut(address, data.len())
            .ok_or_else(|| MemoryError::unmapped(address))?;
        if !sim.region.writable {
            return Err(MemoryAccessError::WriteProtected { address }.into());
        }
        let start = address.as_usize() - sim.region.base.as_usize();
        sim.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn regions(&self) -> MemoryResult<Vec<Region>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.regions.values().map(|sim| sim.region.clone()).collect())
    }

    fn is_alive(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .alive
    }
}

#[derive(Debug)]
struct SimEntry {
    name: String,
    process: Arc<SimulatedProcess>,
    protected: bool,
}

/// A process table of simulated processes
#[derive(Debug, Default)]
pub struct SimulatedSystem {
    processes: RwLock<BTreeMap<ProcessId, SimEntry>>,
}

impl SimulatedSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a process that can be opened
    pub fn spawn(&self, pid: ProcessId, name: impl Into<String>) -> Arc<SimulatedProcess> {
        self.insert(pid, name.into(), false)
    }

    /// Adds a process that is listed but refuses to be opened
    pub fn spawn_protected(&self, pid: ProcessId, name: impl Into<String>) -> Arc<SimulatedProcess> {
        self.insert(pid, name.into(), true)
    }

    fn insert(&self, pid: ProcessId, name: String, protected: bool) -> Arc<SimulatedProcess> {
        let process = Arc::new(SimulatedProcess::new());
        let mut processes = self.processes.write().unwrap_or_else(PoisonError::into_inner);
        processes.insert(
            pid,
            SimEntry {
                name,
                process: Arc::clone(&process),
                protected,
            },
        );
        process
    }

    /// Terminates and removes a process
    pub fn kill(&self, pid: ProcessId) -> bool {
        let mut processes = self.processes.write().unwrap_or_else(PoisonError::into_inner);
        match processes.remove(&pid) {
            Some(entry) => {
                entry.process.terminate();
                true
            }
            None => false,
        }
    }
}

impl ProcessSource for SimulatedSystem {
    fn processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        let processes = self.processes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(processes
            .iter()
            .map(|(pid, entry)| ProcessInfo::new(*pid, entry.name.clone()))
            .collect())
    }

    fn open(&self, pid: ProcessId) -> MemoryResult<OpenedProcess> {
        let processes = self.processes.read().unwrap_or_else(PoisonError::into_inner);
        let entry = processes
            .get(&pid)
            .ok_or(ProcessAccessError::NotFound(pid))?;
        if entry.protected {
            return Err(ProcessAccessError::AccessDenied(pid).into());
        }
        Ok(OpenedProcess {
            info: ProcessInfo::new(pid, entry.name.clone()),
            memory: Box::new(Arc::clone(&entry.process)),
        })
    }
}
