//! Linear (bump-pointer) arena allocator
//!
//! One contiguous block of fixed capacity. Allocation advances a cursor and
//! individual frees are ignored; [`LinearAllocator::clear`] reclaims the
//! whole block at once.
//!
//! `clear` takes `&mut self` while containers borrow their allocator shared,
//! so an arena cannot be cleared while anything built on it is still alive.
//!
//! The block is either drawn from a backing allocator and returned on drop,
//! or lent by the caller through [`LinearAllocator::from_block`].

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

use super::heap::default_heap;
use super::{
    AllocResult, Allocator, AllocatorKind, AllocatorStats, AtomicAllocatorStats,
    StatisticsProvider,
};
use crate::config::AllocatorConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::utils::align_up;
#[cfg(feature = "logging")]
use crate::utils::format_bytes;

/// Alignment of the block backing every arena
pub const BLOCK_ALIGN: usize = 16;

/// Where an arena's block comes from
enum Backing<'p> {
    /// Taken from this allocator, returned on drop
    Allocator(&'p dyn Allocator),
    /// Lent by the caller for `'p`, never freed here
    Block(PhantomData<&'p mut [MaybeUninit<u8>]>),
}

impl Backing<'_> {
    fn name(&self) -> &str {
        match self {
            Backing::Allocator(allocator) => allocator.name(),
            Backing::Block(_) => "caller block",
        }
    }
}

/// A bump-pointer arena allocator over a fixed-size block
///
/// The block is taken from a backing allocator at construction and returned
/// to it on drop, or borrowed from the caller for the arena's lifetime. The
/// backing allocator is only a memory source; attribution in diagnostics is
/// handled by [`AllocatorRegistry`](super::AllocatorRegistry).
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per thread.
///
/// # Example
///
/// ```rust
/// use core::alloc::Layout;
/// use nebula_alloc::allocator::{Allocator, LinearAllocator};
///
/// let mut arena = LinearAllocator::new("scratch", 16)?;
/// let layout = Layout::from_size_align(10, 1).unwrap();
///
/// assert!(arena.allocate(layout).is_ok());
/// assert!(arena.allocate(layout).is_err()); // only 6 bytes left
///
/// arena.clear();
/// assert!(arena.allocate(layout).is_ok());
/// # Ok::<(), nebula_alloc::MemoryError>(())
/// ```
pub struct LinearAllocator<'p> {
    name: String,
    base: NonNull<u8>,
    size: usize,
    offset: Cell<usize>,
    backing: Backing<'p>,
    config: AllocatorConfig,
    stats: AtomicAllocatorStats,
}

impl LinearAllocator<'static> {
    /// Creates an arena of `size` bytes whose block comes from the default heap
    pub fn new(name: impl Into<String>, size: usize) -> MemoryResult<Self> {
        Self::with_config(name, size, AllocatorConfig::default())
    }

    /// Creates an arena on the default heap with an explicit configuration
    pub fn with_config(
        name: impl Into<String>,
        size: usize,
        config: AllocatorConfig,
    ) -> MemoryResult<Self> {
        LinearAllocator::with_parent_and_config(name, size, default_heap(), config)
    }
}

impl<'p> LinearAllocator<'p> {
    /// Creates an arena whose block is taken from `backing`
    pub fn with_parent(
        name: impl Into<String>,
        size: usize,
        backing: &'p dyn Allocator,
    ) -> MemoryResult<Self> {
        Self::with_parent_and_config(name, size, backing, AllocatorConfig::default())
    }

    /// Creates an arena with an explicit backing allocator and configuration
    pub fn with_parent_and_config(
        name: impl Into<String>,
        size: usize,
        backing: &'p dyn Allocator,
        config: AllocatorConfig,
    ) -> MemoryResult<Self> {
        config.validate()?;
        if size == 0 {
            return Err(MemoryError::invalid_config("arena size must be non-zero"));
        }

        let layout = Layout::from_size_align(size, BLOCK_ALIGN)
            .map_err(|_| MemoryError::invalid_layout("arena size overflows a layout"))?;
        let base = backing.allocate(layout)?;

        Ok(Self::over(name.into(), base, size, Backing::Allocator(backing), config))
    }

    /// Creates an arena over memory the caller already owns
    ///
    /// The arena borrows `block` for its whole lifetime and leaves it alone on
    /// drop, so the buffer is usable again once the arena is gone.
    ///
    /// ```rust
    /// use core::alloc::Layout;
    /// use core::mem::MaybeUninit;
    /// use nebula_alloc::allocator::{Allocator, LinearAllocator};
    ///
    /// let mut block = [MaybeUninit::<u8>::uninit(); 64];
    /// let arena = LinearAllocator::from_block("stack", &mut block)?;
    /// assert!(arena.allocate(Layout::new::<u64>()).is_ok());
    /// # Ok::<(), nebula_alloc::MemoryError>(())
    /// ```
    pub fn from_block(
        name: impl Into<String>,
        block: &'p mut [MaybeUninit<u8>],
    ) -> MemoryResult<Self> {
        Self::from_block_with_config(name, block, AllocatorConfig::default())
    }

    /// [`from_block`](Self::from_block) with an explicit configuration
    pub fn from_block_with_config(
        name: impl Into<String>,
        block: &'p mut [MaybeUninit<u8>],
        config: AllocatorConfig,
    ) -> MemoryResult<Self> {
        config.validate()?;
        if block.is_empty() {
            return Err(MemoryError::invalid_config("arena size must be non-zero"));
        }

        let size = block.len();
        let base = NonNull::from(block).cast::<u8>();
        Ok(Self::over(name.into(), base, size, Backing::Block(PhantomData), config))
    }

    fn over(
        name: String,
        base: NonNull<u8>,
        size: usize,
        backing: Backing<'p>,
        config: AllocatorConfig,
    ) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            allocator = %name,
            size = %format_bytes(size),
            backing = backing.name(),
            "created linear allocator"
        );

        Self {
            name,
            base,
            size,
            offset: Cell::new(0),
            backing,
            config,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// Returns the remaining free space in bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.size - self.offset.get()
    }

    /// Returns `true` if `ptr` lies inside this arena's block
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let start = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr <= start + self.size
    }

    /// Resets the arena, invalidating every previous allocation
    ///
    /// Exclusive access proves nothing borrowing this arena is still alive.
    pub fn clear(&mut self) {
        let used = self.offset.get();
        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: [base, base + used) lies inside the block we own and no
            // outstanding borrow can observe it (we hold `&mut self`).
            unsafe { self.base.as_ptr().write_bytes(pattern, used) };
        }

        self.offset.set(0);
        self.stats.record_reset();

        #[cfg(feature = "logging")]
        debug!(allocator = %self.name, released = used, "cleared linear allocator");
    }

    #[cold]
    fn exhausted(&self, requested: usize) -> MemoryError {
        self.stats.record_allocation_failure();
        let available = self.remaining();

        #[cfg(feature = "logging")]
        if self.config.log_failures {
            warn!(
                allocator = %self.name,
                requested = %format_bytes(requested),
                available = %format_bytes(available),
                capacity = %format_bytes(self.size),
                "linear allocator out of memory"
            );
        }

        MemoryError::arena_exhausted(&self.name, requested, available, self.size)
    }
}

impl Allocator for LinearAllocator<'_> {
    fn allocate(&self, layout: Layout) -> AllocResult<NonNull<u8>> {
        let base = self.base.as_ptr() as usize;
        let offset = self.offset.get();

        let start = align_up(base + offset, layout.align())
            .map(|addr| addr - base)
            .ok_or_else(|| self.exhausted(layout.size()))?;
        let end = start
            .checked_add(layout.size())
            .filter(|&end| end <= self.size)
            .ok_or_else(|| self.exhausted(layout.size()))?;

        self.offset.set(end);
        self.stats.record_allocation(end - offset);

        // SAFETY: start <= end <= size, so the pointer stays inside (or one
        // past the end of, for zero-sized requests) the owned block.
        let ptr = unsafe { self.base.add(start) };
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: [start, end) is inside the block and was just reserved.
            unsafe { ptr.as_ptr().write_bytes(pattern, layout.size()) };
        }
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // Individual frees are not supported; space returns on `clear`.
        debug_assert!(
            self.contains(ptr),
            "pointer was not allocated by arena '{}'",
            self.name
        );
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn allocated_bytes(&self) -> usize {
        self.offset.get()
    }

    fn capacity(&self) -> usize {
        self.size
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Linear
    }
}

impl StatisticsProvider for LinearAllocator<'_> {
    fn statistics(&self) -> AllocatorStats {
        self.stats.snapshot()
    }
}

impl Drop for LinearAllocator<'_> {
    fn drop(&mut self) {
        if let Backing::Allocator(backing) = self.backing {
            // SAFETY: `base` came from `backing.allocate` in the constructor
            // and is released exactly once, here.
            unsafe { backing.deallocate(self.base) };
        }
    }
}

impl fmt::Debug for LinearAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearAllocator")
            .field("name", &self.name)
            .field("allocated", &self.offset.get())
            .field("size", &self.size)
            .field("backing", &self.backing.name())
            .finish()
    }
}
