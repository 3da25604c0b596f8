//! Pluggable allocators and allocator-aware containers for Nebula
//!
//! This crate is the engine's manual-memory substrate:
//!
//! - The [`Allocator`](allocator::Allocator) capability
//! - A bump-pointer arena ([`LinearAllocator`](allocator::LinearAllocator))
//! - A size-header heap ([`HeapAllocator`](allocator::HeapAllocator)) with a
//!   process-wide default instance
//! - A diagnostics tree of allocators ([`AllocatorRegistry`](allocator::AllocatorRegistry))
//! - Containers that draw all storage from a borrowed allocator:
//!   [`DynamicArray`](collections::DynamicArray),
//!   [`DynamicString`](collections::DynamicString) and the fixed-capacity
//!   [`RobinHashMap`](collections::RobinHashMap)
//!
//! Containers borrow their allocator, so the compiler rejects any container
//! that would outlive it, and an arena cannot be cleared while a container
//! built on it is alive.
//!
//! # Features
//!
//! - `logging` (default): emit `tracing` events for allocation failures,
//!   arena resets and registry changes
//!
//! # Example
//!
//! ```rust
//! use nebula_alloc::prelude::*;
//!
//! fn main() -> nebula_alloc::Result<()> {
//!     let mut frame = LinearAllocator::new("frame", 4096)?;
//!     {
//!         let mut ids = DynamicArray::new_in(&frame);
//!         ids.extend([3u32, 1, 4]);
//!
//!         let mut names = RobinHashMap::with_capacity_in(16, &frame);
//!         names.insert(DynamicString::from_str_in("pi", &frame), 314);
//!
//!         assert_eq!(ids.len(), 3);
//!     }
//!     // every container above is gone, so the arena may be reset
//!     frame.clear();
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
// Raw allocation and placement of container elements
#![allow(unsafe_code)]

pub mod allocator;
pub mod collections;
pub mod config;
pub mod error;
pub mod utils;

pub use error::{ErrorCategory, MemoryError, MemoryResult, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types
pub mod prelude {
    pub use crate::allocator::{
        Allocator, AllocatorKind, AllocatorRegistry, HeapAllocator, LinearAllocator, MemoryUsage,
        StatisticsProvider, default_heap,
    };
    pub use crate::collections::{DynamicArray, DynamicString, RobinHashMap};
    pub use crate::config::AllocatorConfig;
    pub use crate::error::{MemoryError, MemoryResult};
}

/// Initialize the allocator subsystem
///
/// Creates the process-wide default heap up front so the first container
/// built without an explicit allocator does not pay for it. Calling this is
/// optional and idempotent.
///
/// # Example
///
/// ```
/// use nebula_alloc::allocator::{Allocator, default_heap};
///
/// nebula_alloc::init();
/// assert_eq!(default_heap().allocated_bytes(), 0);
/// ```
pub fn init() {
    let heap = allocator::default_heap();

    #[cfg(feature = "logging")]
    tracing::info!(
        version = VERSION,
        default_heap = allocator::Allocator::name(heap),
        "nebula-alloc initialized"
    );
    #[cfg(not(feature = "logging"))]
    let _ = heap;
}
