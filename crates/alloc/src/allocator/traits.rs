//! The allocator capability
//!
//! Every container in this crate is written against [`Allocator`] and never
//! touches the global allocator directly. The trait is object safe: containers
//! hold a borrowed `&'a dyn Allocator`, and the borrow checker (rather than a
//! caller promise) guarantees the allocator outlives every container built on
//! it.
//!
//! # Safety
//!
//! Implementors must ensure that:
//! - A pointer returned by `allocate` is valid for reads and writes of
//!   `layout.size()` bytes and aligned to `layout.align()`
//! - The memory stays valid until the same instance deallocates it, or until
//!   an operation taking `&mut self` (such as an arena clear) or the
//!   allocator's own drop invalidates it wholesale
//! - `deallocate` accepts exactly the pointers this instance handed out

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use crate::error::AllocResult;
use crate::utils::format_bytes;

/// Strategy tag reported by every allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// Bump-pointer arena over one fixed block
    Linear,
    /// General-purpose heap with per-allocation size headers
    Heap,
}

impl fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Heap => write!(f, "heap"),
        }
    }
}

/// Pluggable raw-memory allocator
///
/// Allocation failure is reported as an error value; containers decide
/// whether that is fatal. Memory returned by `allocate` is uninitialized.
pub trait Allocator {
    /// Allocates at least `layout.size()` bytes aligned to `layout.align()`
    ///
    /// # Errors
    /// - Returns error if the allocator has no room for the request
    /// - Returns error if the system heap refuses the request
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Returns memory to the allocator
    ///
    /// # Safety
    /// - `ptr` must have been returned by `allocate` on this same instance
    /// - `ptr` must not have been deallocated already
    /// - After this call `ptr` is dangling and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>);

    /// Human-readable allocator name used in diagnostics
    fn name(&self) -> &str;

    /// Bytes currently handed out by this allocator
    fn allocated_bytes(&self) -> usize;

    /// Total capacity in bytes; `0` means unbounded
    fn capacity(&self) -> usize;

    /// Strategy tag
    fn kind(&self) -> AllocatorKind;
}

/// Returns `true` if both references point at the same allocator instance
///
/// Identity is the object address; names are not required to be unique.
#[inline]
pub fn is_same_allocator(a: &dyn Allocator, b: &dyn Allocator) -> bool {
    core::ptr::addr_eq(a as *const dyn Allocator, b as *const dyn Allocator)
}

/// Used / capacity view of an allocator
///
/// Blanket-implemented for every [`Allocator`]; a capacity of `0` reads as
/// unbounded.
pub trait MemoryUsage {
    fn used_memory(&self) -> usize;

    /// Bytes still available, `None` when unbounded
    fn available_memory(&self) -> Option<usize>;

    fn memory_usage(&self) -> BasicMemoryUsage {
        let used = self.used_memory();
        BasicMemoryUsage {
            used,
            capacity: self.available_memory().map(|available| used + available),
        }
    }
}

impl<A: Allocator + ?Sized> MemoryUsage for A {
    fn used_memory(&self) -> usize {
        self.allocated_bytes()
    }

    fn available_memory(&self) -> Option<usize> {
        match self.capacity() {
            0 => None,
            capacity => Some(capacity.saturating_sub(self.allocated_bytes())),
        }
    }
}

/// Usage snapshot of one allocator
///
/// Displays as `used / capacity`, e.g. `100 B / 8.00 KB` or
/// `2.00 KB / unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicMemoryUsage {
    pub used: usize,
    /// `None` for unbounded allocators
    pub capacity: Option<usize>,
}

impl BasicMemoryUsage {
    pub fn available(&self) -> Option<usize> {
        self.capacity.map(|capacity| capacity.saturating_sub(self.used))
    }

    /// Fill level in percent, `None` when unbounded
    pub fn percent(&self) -> Option<f64> {
        self.capacity.map(|capacity| match capacity {
            0 => 0.0,
            capacity => self.used as f64 * 100.0 / capacity as f64,
        })
    }
}

impl fmt::Display for BasicMemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capacity {
            Some(capacity) => write!(f, "{} / {}", format_bytes(self.used), format_bytes(capacity)),
            None => write!(f, "{} / unbounded", format_bytes(self.used)),
        }
    }
}
