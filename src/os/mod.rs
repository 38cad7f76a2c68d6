//! Platform backends implementing [`ProcessMemory`]
//!
//! Linux reads `/proc/<pid>/maps` for the memory map and moves bytes with
//! `process_vm_readv`/`process_vm_writev` via `nix`.
//! Windows uses `OpenProcess`, `VirtualQueryEx` and
//! `Read/WriteProcessMemory` through `winapi`.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

use crate::core::types::{MemoryResult, ProcessId};
use crate::process::ProcessMemory;

/// Opens `pid` with the native backend for this platform
#[cfg(target_os = "linux")]
pub fn open_process(pid: ProcessId) -> MemoryResult<Box<dyn ProcessMemory>> {
    Ok(Box::new(linux::LinuxProcess::open(pid)?))
}

/// Opens `pid` with the native backend for this platform
#[cfg(windows)]
pub fn open_process(pid: ProcessId) -> MemoryResult<Box<dyn ProcessMemory>> {
    Ok(Box::new(windows::WindowsProcess::open(pid)?))
}

/// Opens `pid` with the native backend for this platform
#[cfg(not(any(target_os = "linux", windows)))]
pub fn open_process(pid: ProcessId) -> MemoryResult<Box<dyn ProcessMemory>> {
    Err(crate::core::types::MemoryError::UnsupportedOperation(format!(
        "no process memory backend for this platform (pid {})",
        pid
    )))
}
