//! Error taxonomy for Memory-Inspector
//!
//! Every request/response operation surfaces one of the typed errors below.
//! They are grouped by concern and nested under [`MemoryError`], which is what
//! the engine and the command transport return.

use super::{Address, ProcessId};
use thiserror::Error;

/// Failures opening or using the attached process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessAccessError {
    #[error("Process not found: {0}")]
    NotFound(ProcessId),

    #[error("Access denied to process {0}")]
    AccessDenied(ProcessId),

    #[error("Process already attached: {0}")]
    AlreadyOpen(ProcessId),

    #[error("No process is attached")]
    NotAttached,
}

/// Failures touching target memory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryAccessError {
    #[error("Memory at {address} is not readable")]
    Unreadable { address: Address },

    #[error("Memory at {address} is write protected")]
    WriteProtected { address: Address },

    #[error("Invalid memory address: {address}")]
    InvalidAddress { address: Address },

    #[error("Memory at {address} is no longer mapped")]
    Unmapped { address: Address },
}

/// Failures caused by calling scan operations in the wrong order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanStateError {
    #[error("No active scan session")]
    NoActiveSession,
}

/// Rejected inputs; memory is never touched when one of these is returned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported value size: {0} (expected 1, 2 or 4)")]
    BadSize(usize),

    #[error("Value {value} does not fit in {size} byte(s)")]
    BadRange { value: u64, size: usize },

    #[error("Watch requires at least one address")]
    EmptyWatch,
}

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error(transparent)]
    Process(#[from] ProcessAccessError),

    #[error(transparent)]
    Access(#[from] MemoryAccessError),

    #[error(transparent)]
    Scan(#[from] ScanStateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Error family name used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            MemoryError::Process(_) => "ProcessAccessError",
            MemoryError::Access(_) => "MemoryAccessError",
            MemoryError::Scan(_) => "ScanStateError",
            MemoryError::Validation(_) => "ValidationError",
            MemoryError::UnsupportedOperation(_) => "UnsupportedOperation",
            MemoryError::IoError(_) => "IoError",
            MemoryError::JsonError(_) => "RequestError",
        }
    }

    /// Variant name used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            MemoryError::Process(e) => match e {
                ProcessAccessError::NotFound(_) => "NotFound",
                ProcessAccessError::AccessDenied(_) => "AccessDenied",
                ProcessAccessError::AlreadyOpen(_) => "AlreadyOpen",
                ProcessAccessError::NotAttached => "NotAttached",
            },
            MemoryError::Access(e) => match e {
                MemoryAccessError::Unreadable { .. } => "Unreadable",
                MemoryAccessError::WriteProtected { .. } => "WriteProtected",
                MemoryAccessError::InvalidAddress { .. } => "InvalidAddress",
                MemoryAccessError::Unmapped { .. } => "Unmapped",
            },
            MemoryError::Scan(ScanStateError::NoActiveSession) => "NoActiveSession",
            MemoryError::Validation(e) => match e {
                ValidationError::BadSize(_) => "BadSize",
                ValidationError::BadRange { .. } => "BadRange",
                ValidationError::EmptyWatch => "EmptyWatch",
            },
            MemoryError::UnsupportedOperation(_) => "Unsupported",
            MemoryError::IoError(_) => "Io",
            MemoryError::JsonError(_) => "MalformedRequest",
        }
    }

    /// Creates an unreadable-memory error
    pub fn unreadable(address: impl Into<Address>) -> Self {
        MemoryAccessError::Unreadable {
            address: address.into(),
        }
        .into()
    }

    /// Creates an unmapped-memory error
    pub fn unmapped(address: impl Into<Address>) -> Self {
        MemoryAccessError::Unmapped {
            address: address.into(),
        }
        .into()
    }

    /// True when the error means the memory itself could not be accessed
    pub fn is_memory_access(&self) -> bool {
        matches!(self, MemoryError::Access(_))
    }
}
