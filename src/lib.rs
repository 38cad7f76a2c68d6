//! Memory-Inspector: live process memory inspection
//!
//! Attach to a running process, find every address holding a value, narrow
//! the candidates as the value changes, watch addresses for updates and
//! write new values back. [`Engine`] owns all state; [`Server`] exposes it
//! as a line-delimited JSON protocol.

pub mod config;
pub mod core;
pub mod engine;
pub mod memory;
pub mod os;
pub mod process;
pub mod server;
pub mod watch;

pub use crate::core::types::{
    Address, HandleState, MemoryChunk, MemoryError, MemoryResult, ProcessId, ProcessInfo, Region,
    ScanSession, Settings, ValueSize, WatchId,
};
pub use crate::core::*;
pub use engine::Engine;
pub use server::{Request, Response, Server};
pub use watch::{WatchEvent, WatchSubscription, WatchTarget};
