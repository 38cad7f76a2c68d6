//! Core module containing fundamental types for Memory-Inspector
//!
//! This module provides the foundational building blocks used throughout
//! the engine, including address handling, value widths, scan sessions,
//! process information, and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{Address, MemoryChunk, MemoryError, MemoryResult, ProcessInfo, ValueSize};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Memory-Inspector requires 64-bit architecture");
