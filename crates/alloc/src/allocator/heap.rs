//! General-purpose heap allocator
//!
//! Wraps the system allocator and records, in front of every block, the size
//! and alignment the caller asked for. That header lets `deallocate` take a
//! bare pointer and keeps exact live-byte accounting.
//!
//! ```text
//! base                       ptr (returned)
//! |<------- header span ------>|<------ size ------>|
//! | padding ... | size | align |  user bytes ...     |
//! ```
//!
//! The header span is the header size rounded up to the block alignment, so
//! the user pointer keeps the requested alignment and the header itself
//! always sits directly below it.

use core::alloc::{GlobalAlloc, Layout};
use core::fmt;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;
use std::alloc::System;
use std::sync::OnceLock;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

use super::{
    AllocError, AllocResult, Allocator, AllocatorKind, AllocatorStats, AtomicAllocatorStats,
    StatisticsProvider,
};
use crate::config::AllocatorConfig;
use crate::utils::align_up;
#[cfg(feature = "logging")]
use crate::utils::format_bytes;

/// Bookkeeping stored immediately before each user pointer
#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct Header {
    size: usize,
    align: usize,
}

const HEADER_SIZE: usize = size_of::<Header>();

/// Name of the process-wide default heap
pub const DEFAULT_HEAP_NAME: &str = "default heap";

static DEFAULT_HEAP: OnceLock<HeapAllocator> = OnceLock::new();

/// Returns the process-wide default heap, creating it on first use
///
/// Containers constructed without an explicit allocator draw from here.
pub fn default_heap() -> &'static HeapAllocator {
    DEFAULT_HEAP.get_or_init(|| HeapAllocator::new(DEFAULT_HEAP_NAME))
}

/// Heap allocator with per-allocation size headers and byte accounting
///
/// Thread-safe: counters are atomic, so one instance can be shared (the
/// default heap is a `static`).
pub struct HeapAllocator {
    name: String,
    config: AllocatorConfig,
    stats: AtomicAllocatorStats,
}

impl HeapAllocator {
    /// Creates a heap allocator with the default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, AllocatorConfig::default())
    }

    /// Creates a heap allocator with an explicit configuration
    ///
    /// An invalid configuration falls back to the production preset.
    pub fn with_config(name: impl Into<String>, config: AllocatorConfig) -> Self {
        let name = name.into();
        let config = match config.validate() {
            Ok(()) => config,
            Err(_error) => {
                #[cfg(feature = "logging")]
                warn!(allocator = %name, error = %_error, "using production allocator config");
                AllocatorConfig::production()
            }
        };

        #[cfg(feature = "logging")]
        debug!(allocator = %name, "created heap allocator");

        Self {
            name,
            config,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// Largest number of user bytes ever live at once
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.stats.peak_allocated()
    }

    /// Number of blocks handed out and not yet returned
    #[inline]
    pub fn live_allocations(&self) -> usize {
        self.stats.snapshot().live_allocations()
    }

    /// Returns the configuration in effect
    #[inline]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    fn block_align(align: usize) -> usize {
        align.max(align_of::<Header>())
    }

    fn header_span(block_align: usize) -> usize {
        // HEADER_SIZE is tiny and block_align is a valid Layout alignment, so
        // this cannot overflow.
        align_up(HEADER_SIZE, block_align).unwrap_or(usize::MAX)
    }

    fn block_layout(layout: Layout) -> AllocResult<(Layout, usize)> {
        let block_align = Self::block_align(layout.align());
        let span = Self::header_span(block_align);
        let total = span
            .checked_add(layout.size())
            .ok_or_else(|| AllocError::size_overflow("heap block size"))?;
        let block = Layout::from_size_align(total, block_align)
            .map_err(|_| AllocError::invalid_layout("heap block exceeds isize::MAX"))?;
        Ok((block, span))
    }

    #[cold]
    fn exhausted(&self, layout: Layout) -> AllocError {
        self.stats.record_allocation_failure();

        #[cfg(feature = "logging")]
        if self.config.log_failures {
            warn!(
                allocator = %self.name,
                requested = %format_bytes(layout.size()),
                align = layout.align(),
                capacity = "unbounded",
                "heap allocator out of memory"
            );
        }

        AllocError::allocation_failed(&self.name, layout)
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new("heap")
    }
}

impl Allocator for HeapAllocator {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let (block, span) = Self::block_layout(layout).inspect_err(|_| {
            self.stats.record_allocation_failure();
        })?;

        // SAFETY: `block` has non-zero size (the header is always present).
        let base = unsafe { System.alloc(block) };
        let Some(base) = NonNull::new(base) else {
            return Err(self.exhausted(layout));
        };

        // SAFETY: span <= block.size(), and span >= HEADER_SIZE so the header
        // slot lies inside the block. The user pointer is aligned to
        // block_align >= align_of::<Header>(), as is span, so the header slot
        // is aligned too.
        let ptr = unsafe {
            let ptr = base.add(span);
            ptr.sub(HEADER_SIZE).cast::<Header>().write(Header {
                size: layout.size(),
                align: layout.align(),
            });
            ptr
        };

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: the user region [ptr, ptr + size) is inside the block.
            unsafe { ptr.as_ptr().write_bytes(pattern, layout.size()) };
        }

        self.stats.record_allocation(layout.size());
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees `ptr` came from `allocate` on this
        // instance, so a header written there sits directly below it.
        let header = unsafe { ptr.sub(HEADER_SIZE).cast::<Header>().read() };

        let block_align = Self::block_align(header.align);
        let span = Self::header_span(block_align);

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the user region is still owned until the free below.
            unsafe { ptr.as_ptr().write_bytes(pattern, header.size) };
        }

        // SAFETY: this is the exact layout `allocate` built for this block,
        // and `base` is the pointer System returned.
        unsafe {
            let block = Layout::from_size_align_unchecked(span + header.size, block_align);
            System.dealloc(ptr.sub(span).as_ptr(), block);
        }

        self.stats.record_deallocation(header.size);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn allocated_bytes(&self) -> usize {
        self.stats.current_allocated()
    }

    fn capacity(&self) -> usize {
        0
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Heap
    }
}

impl StatisticsProvider for HeapAllocator {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }
}

impl fmt::Debug for HeapAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("name", &self.name)
            .field("allocated", &self.allocated_bytes())
            .field("high_water_mark", &self.high_water_mark())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;

    #[test]
    fn test_accounting() {
        let heap = HeapAllocator::new("accounting");
        let a = heap.allocate(Layout::from_size_align(100, 1).unwrap()).unwrap();
        let b = heap.allocate(Layout::from_size_align(28, 4).unwrap()).unwrap();
        assert_eq!(heap.allocated_bytes(), 128);
        assert_eq!(heap.live_allocations(), 2);

        unsafe { heap.deallocate(a) };
        assert_eq!(heap.allocated_bytes(), 28);

        unsafe { heap.deallocate(b) };
        assert_eq!(heap.allocated_bytes(), 0);
        assert_eq!(heap.high_water_mark(), 128);
        assert_eq!(heap.live_allocations(), 0);
    }

    #[test]
    fn test_alignment_honored() {
        let heap = HeapAllocator::new("aligned");
        for align in [1, 2, 8, 16, 64, 256, 4096] {
            let layout = Layout::from_size_align(24, align).unwrap();
            let ptr = heap.allocate(layout).unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0, "align {align}");
            unsafe { heap.deallocate(ptr) };
        }
        assert_eq!(heap.allocated_bytes(), 0);
    }

    #[test]
    fn test_zero_size() {
        let heap = HeapAllocator::new("zero");
        let ptr = heap.allocate(Layout::from_size_align(0, 8).unwrap()).unwrap();
        assert_eq!(heap.allocated_bytes(), 0);
        assert_eq!(heap.live_allocations(), 1);
        unsafe { heap.deallocate(ptr) };
        assert_eq!(heap.live_allocations(), 0);
    }

    #[test]
    fn test_memory_is_writable() {
        let heap = HeapAllocator::with_config("rw", AllocatorConfig::debug());
        let layout = Layout::array::<u32>(16).unwrap();
        let ptr = heap.allocate(layout).unwrap().cast::<u32>();
        unsafe {
            assert_eq!(ptr.as_ptr().cast::<u8>().read(), 0xAA);
            for i in 0..16 {
                ptr.add(i).write(i as u32);
            }
            assert_eq!(ptr.add(15).read(), 15);
            heap.deallocate(ptr.cast());
        }
    }

    #[test]
    fn test_failure_names_allocator() {
        let heap = HeapAllocator::with_config("asset heap", AllocatorConfig::silent());
        let layout = Layout::from_size_align(isize::MAX as usize / 2, 8).unwrap();

        let err = heap.allocate(layout).unwrap_err();
        assert_eq!(err, MemoryError::allocation_failed("asset heap", layout));
        assert!(err.to_string().contains("asset heap"));
        assert!(err.to_string().contains("unbounded"));

        let stats = heap.statistics();
        assert_eq!(stats.failed_allocations, 1);
        assert_eq!(stats.allocation_count, 0);
        assert_eq!(heap.allocated_bytes(), 0);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let config = AllocatorConfig {
            alloc_pattern: Some(1),
            dealloc_pattern: Some(1),
            log_failures: true,
        };
        let heap = HeapAllocator::with_config("fallback", config);
        assert_eq!(*heap.config(), AllocatorConfig::production());
    }

    #[test]
    fn test_default_heap_is_singleton() {
        let a = default_heap();
        let b = default_heap();
        assert!(core::ptr::eq(a, b));
        assert_eq!(a.name(), DEFAULT_HEAP_NAME);
        assert_eq!(a.kind(), AllocatorKind::Heap);
        assert_eq!(a.capacity(), 0);
    }
}
