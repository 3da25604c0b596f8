//! Standalone error types for nebula-alloc
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.
//!
//! Only two of the three failure families are represented here. Capacity
//! exhaustion and contract violations are errors; a missing key or value is
//! an ordinary `None` returned by the lookup itself.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::warn;

use crate::utils::format_bytes;

// ============================================================================
// Main Error Types
// ============================================================================

/// Memory management errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    // --- Allocation Errors ---
    #[error(
        "Allocator '{allocator}' failed to allocate {} with {align} byte alignment, capacity unbounded",
        format_bytes(*size)
    )]
    AllocationFailed {
        allocator: String,
        size: usize,
        align: usize,
    },

    #[error("Invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    // --- Arena Errors ---
    #[error(
        "Arena '{arena_id}' exhausted: requested {}, available {} of {}",
        format_bytes(*requested),
        format_bytes(*available),
        format_bytes(*capacity)
    )]
    ArenaExhausted {
        arena_id: String,
        requested: usize,
        available: usize,
        capacity: usize,
    },

    // --- Table Errors ---
    #[error("Hash table full: {max_count} entries allowed in {capacity} buckets")]
    TableFull { capacity: usize, max_count: usize },

    // --- Registry Errors ---
    #[error("Parent allocator '{name}' is not registered")]
    ParentNotFound { name: String },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Broad failure family of a [`MemoryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An arena, the system heap or a fixed-size table has no room left
    CapacityExhausted,
    /// The caller broke an API precondition
    ContractViolation,
    /// A lookup target does not exist
    NotFound,
}

impl MemoryError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "MEM:ALLOC:FAILED",
            Self::InvalidLayout { .. } => "MEM:ALLOC:LAYOUT",
            Self::SizeOverflow { .. } => "MEM:ALLOC:OVERFLOW",
            Self::ArenaExhausted { .. } => "MEM:ARENA:EXHAUSTED",
            Self::TableFull { .. } => "MEM:TABLE:FULL",
            Self::ParentNotFound { .. } => "MEM:REGISTRY:PARENT",
            Self::InvalidConfig { .. } => "MEM:CONFIG:INVALID",
        }
    }

    /// Failure family this error belongs to
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AllocationFailed { .. } | Self::ArenaExhausted { .. } => {
                ErrorCategory::CapacityExhausted
            }
            Self::TableFull { .. }
            | Self::InvalidLayout { .. }
            | Self::SizeOverflow { .. }
            | Self::InvalidConfig { .. } => ErrorCategory::ContractViolation,
            Self::ParentNotFound { .. } => ErrorCategory::NotFound,
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create allocation failed error for the allocator named `allocator`
    pub fn allocation_failed(allocator: &str, layout: Layout) -> Self {
        Self::AllocationFailed {
            allocator: allocator.to_string(),
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Create invalid layout error
    pub fn invalid_layout(reason: &str) -> Self {
        Self::InvalidLayout {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create arena exhausted error
    pub fn arena_exhausted(
        arena_id: &str,
        requested: usize,
        available: usize,
        capacity: usize,
    ) -> Self {
        Self::ArenaExhausted {
            arena_id: arena_id.to_string(),
            requested,
            available,
            capacity,
        }
    }

    /// Create table full error
    pub fn table_full(capacity: usize, max_count: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(capacity, max_count, "hash table load factor exceeded");

        Self::TableFull {
            capacity,
            max_count,
        }
    }

    /// Create parent not found error
    pub fn parent_not_found(name: &str) -> Self {
        Self::ParentNotFound {
            name: name.to_string(),
        }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for memory operations
pub type MemoryResult<T> = core::result::Result<T, MemoryError>;

/// Generic result type alias
pub type Result<T> = MemoryResult<T>;

/// Aliases used throughout the allocator module
pub type AllocError = MemoryError;
pub type AllocResult<T> = MemoryResult<T>;

// ============================================================================
// Tests
// ============================================================================
