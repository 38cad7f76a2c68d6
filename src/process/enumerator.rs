//! Process enumeration through `sysinfo`, and the real-OS [`ProcessSource`]

use super::access::{OpenedProcess, ProcessSource};
use crate::core::types::{MemoryResult, ProcessAccessError, ProcessId, ProcessInfo};
use crate::os;
use sysinfo::{Pid, System};
use tracing::debug;

/// Enumerate all running processes, ordered by pid
pub fn enumerate_processes() -> MemoryResult<Vec<ProcessInfo>> {
    let system = System::new_all();
    let mut processes: Vec<ProcessInfo> = system
        .processes()
        .values()
        .map(|process| {
            ProcessInfo::new(
                process.pid().as_u32(),
                process.name().to_string_lossy().into_owned(),
            )
        })
        .collect();
    processes.sort_by_key(|p| p.pid);
    debug!(count = processes.len(), "enumerated processes");
    Ok(processes)
}

/// Get process by PID
pub fn get_process_by_pid(pid: ProcessId) -> Option<ProcessInfo> {
    let system = System::new_all();
    system.process(Pid::from_u32(pid)).map(|process| {
        ProcessInfo::new(pid, process.name().to_string_lossy().into_owned())
    })
}

/// The processes of the machine this engine runs on
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl SystemProcesses {
    pub fn new() -> Self {
        SystemProcesses
    }
}

impl ProcessSource for SystemProcesses {
    fn processes(&self) -> MemoryResult<Vec<ProcessInfo>> {
        enumerate_processes()
    }

    fn open(&self, pid: ProcessId) -> MemoryResult<OpenedProcess> {
        let info = get_process_by_pid(pid).ok_or(ProcessAccessError::NotFound(pid))?;
        let memory = os::open_process(pid)?;
        Ok(OpenedProcess { info, memory })
    }
}
