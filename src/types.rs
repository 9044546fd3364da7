/*!
 * Allocator Types
 * Error taxonomy and diagnostic reports
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_MEDIUM, PRESSURE_WARNING};
use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allocator operation result
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocator errors
///
/// Every failure is local and recoverable from the allocator's perspective;
/// callers decide whether an allocation failure is fatal to them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("out of memory: requested {requested} bytes, {available} bytes free of {total} total")]
    OutOfMemory {
        requested: Size,
        available: Size,
        total: Size,
    },

    #[error("invalid allocation size: {0}")]
    InvalidSize(Size),

    #[error("invalid alignment: {0} (must be a nonzero power of two)")]
    InvalidAlignment(Size),

    #[error("address out of range: {0:#x}")]
    OutOfRange(Address),

    #[error("freelist corruption possible at offset {0:#x}")]
    CorruptionDetected(Address),

    #[error("freelist node pool exhausted: all {capacity} entries in use")]
    NodePoolExhausted { capacity: u32 },

    #[error("backing storage size mismatch: provided {provided} bytes, required {required}")]
    StorageSizeMismatch { provided: usize, required: usize },
}

/// Allocator statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryReport {
    pub total_space: Size,
    pub used_space: Size,
    pub free_space: Size,
    pub usage_percentage: f64,
    pub live_allocations: usize,
    pub free_ranges: usize,
}

impl MemoryReport {
    pub fn pressure(&self) -> MemoryPressure {
        let ratio = self.usage_percentage / 100.0;
        if ratio >= PRESSURE_CRITICAL {
            MemoryPressure::Critical
        } else if ratio >= PRESSURE_WARNING {
            MemoryPressure::High
        } else if ratio >= PRESSURE_MEDIUM {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
