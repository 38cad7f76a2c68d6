//! Process discovery and the attached-process handle
//!
//! This module defines the seams to the operating system ([`ProcessMemory`],
//! [`ProcessSource`]), the live listing of processes, and [`TargetHandle`],
//! through which all memory I/O against the attached process flows.

pub mod access;
pub mod enumerator;
pub mod handle;
pub mod simulated;

pub use access::{OpenedProcess, ProcessMemory, ProcessSource};
pub use enumerator::{enumerate_processes, SystemProcesses};
pub use handle::TargetHandle;
pub use simulated::{SimulatedProcess, SimulatedSystem};
