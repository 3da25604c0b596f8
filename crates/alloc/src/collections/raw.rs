//! Raw typed buffer shared by the array and string containers
//!
//! Owns an uninitialized block of `capacity` slots from an [`Allocator`]. It
//! never constructs or drops elements; the owning container tracks which
//! prefix is live.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::size_of;
use core::ptr::NonNull;

use crate::allocator::{AllocResult, Allocator};
use crate::error::MemoryError;

/// Capacity reserved by the first insert into an empty container
pub(crate) const INITIAL_CAPACITY: usize = 2;

/// Capacity after one growth step: `capacity * 1.5`, at least one more slot
#[inline]
pub(crate) const fn grown_capacity(capacity: usize) -> usize {
    if capacity == 0 {
        INITIAL_CAPACITY
    } else {
        let grown = capacity.saturating_add(capacity / 2);
        if grown > capacity { grown } else { capacity.saturating_add(1) }
    }
}

pub(crate) struct RawBuf<'a, T> {
    ptr: NonNull<T>,
    capacity: usize,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<T>,
}

impl<'a, T> RawBuf<'a, T> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// Empty buffer that has not touched the allocator
    pub(crate) fn new_in(allocator: &'a dyn Allocator) -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            allocator,
            _marker: PhantomData,
        }
    }

    pub(crate) fn with_capacity_in(
        capacity: usize,
        allocator: &'a dyn Allocator,
    ) -> AllocResult<Self> {
        let mut buf = Self::new_in(allocator);
        buf.grow_to(capacity, 0)?;
        Ok(buf)
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &'a dyn Allocator {
        self.allocator
    }

    /// `true` once a real block has been obtained
    #[inline]
    pub(crate) fn is_allocated(&self) -> bool {
        !Self::IS_ZST && self.capacity > 0
    }

    /// Ensures room for `additional` more slots past the first `len`
    ///
    /// Grows geometrically so that repeated single-slot reservations stay
    /// amortized O(1).
    pub(crate) fn reserve(&mut self, len: usize, additional: usize) -> AllocResult<()> {
        let required = len
            .checked_add(additional)
            .ok_or_else(|| MemoryError::size_overflow("container capacity"))?;
        if required <= self.capacity {
            return Ok(());
        }
        self.grow_to(required.max(grown_capacity(self.capacity)), len)
    }

    /// Ensures room for exactly `additional` more slots past the first `len`
    pub(crate) fn reserve_exact(&mut self, len: usize, additional: usize) -> AllocResult<()> {
        let required = len
            .checked_add(additional)
            .ok_or_else(|| MemoryError::size_overflow("container capacity"))?;
        if required <= self.capacity {
            return Ok(());
        }
        self.grow_to(required, len)
    }

    /// Moves the first `len` slots into a fresh block of `new_capacity` slots
    fn grow_to(&mut self, new_capacity: usize, len: usize) -> AllocResult<()> {
        if Self::IS_ZST || new_capacity <= self.capacity {
            return Ok(());
        }
        debug_assert!(len <= self.capacity);

        let layout = Layout::array::<T>(new_capacity)
            .map_err(|_| MemoryError::size_overflow("container capacity"))?;
        let new_ptr = self.allocator.allocate(layout)?.cast::<T>();

        if self.is_allocated() {
            // SAFETY: both blocks hold at least `len` slots and are distinct
            // allocations; the old block came from this same allocator.
            unsafe {
                core::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
                self.allocator.deallocate(self.ptr.cast());
            }
        }

        self.ptr = new_ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Returns the block to the allocator, leaving an empty buffer
    pub(crate) fn release(&mut self) {
        if self.is_allocated() {
            // SAFETY: the block came from `self.allocator` and is forgotten
            // immediately after.
            unsafe { self.allocator.deallocate(self.ptr.cast()) };
            self.ptr = NonNull::dangling();
            self.capacity = 0;
        }
    }

    /// Takes the block, leaving `self` empty on the same allocator
    pub(crate) fn take(&mut self) -> Self {
        let allocator = self.allocator;
        core::mem::replace(self, Self::new_in(allocator))
    }
}

impl<T> Drop for RawBuf<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}
