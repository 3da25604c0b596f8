//! Allocator-aware containers
//!
//! Every container borrows an [`Allocator`](crate::allocator::Allocator) for
//! its whole life and draws all storage from it. Growing operations come in
//! pairs: the plain form panics when the allocator is out of memory, the
//! `try_` form returns the error.

mod raw;

pub mod array;
pub mod hash;
pub mod robin_map;
pub mod string;

pub use array::DynamicArray;
pub use hash::{BuildDjb2, DJB2_SEED, Djb2Hasher, djb2};
pub use robin_map::RobinHashMap;
pub use string::DynamicString;

use crate::error::MemoryError;

/// Aborts the current operation after an allocation failure
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn allocation_failure(error: MemoryError) -> ! {
    panic!("{error}")
}
