//! Pluggable allocators
//!
//! The [`Allocator`] capability plus its two strategies (a bump-pointer
//! arena and a size-header heap) and the diagnostics registry.

// Core allocator types
mod stats;
mod traits;

// Allocator implementations
pub mod heap;
pub mod linear;
pub mod registry;

// Re-exports for convenience
pub use crate::error::{AllocError, AllocResult};
pub use heap::{DEFAULT_HEAP_NAME, HeapAllocator, default_heap};
pub use linear::LinearAllocator;
pub use registry::{AllocatorNodeInfo, AllocatorRegistry};
pub use stats::{AllocatorStats, AtomicAllocatorStats, StatisticsProvider};
pub use traits::{Allocator, AllocatorKind, BasicMemoryUsage, MemoryUsage, is_same_allocator};
