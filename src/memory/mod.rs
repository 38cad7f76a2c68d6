//! Memory operations against the attached process
//!
//! This module provides:
//! - A sorted snapshot of the memory map ([`RegionMap`])
//! - Batched candidate re-reads
//! - The parallel populate scan and candidate narrowing ([`MemoryScanner`])
//! - Windowed neighbor reads
//! - Validated writes ([`MemoryWriter`])

pub mod neighbors;
pub mod reader;
pub mod regions;
pub mod scanner;
pub mod writer;

pub use neighbors::neighbors;
pub use reader::read_values;
pub use regions::RegionMap;
pub use scanner::MemoryScanner;
pub use writer::{MemoryWriter, BHOP_SEQUENCE};
