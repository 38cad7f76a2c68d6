//! Core type definitions for Memory-Inspector
//!
//! This module contains all fundamental types used throughout the engine,
//! including addresses, value widths, regions, scan state and error types.

mod address;
mod error;
mod process_info;
mod region;
mod scan_result;
mod value;

// Re-export all public types
pub use address::{parse_address, Address};
pub use error::{
    MemoryAccessError, MemoryError, MemoryResult, ProcessAccessError, ScanStateError,
    ValidationError,
};
pub use process_info::{HandleState, ProcessInfo};
pub use region::Region;
pub use scan_result::{Candidate, MemoryChunk, ScanSession, Settings};
pub use value::ValueSize;

// Common type aliases
pub type ProcessId = u32;
pub type WatchId = u64;
