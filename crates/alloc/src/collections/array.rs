//! Growable array over a borrowed allocator

use core::fmt;
use core::ops::{Deref, DerefMut};
use core::ptr;

use super::allocation_failure;
use super::raw::RawBuf;
use crate::allocator::{AllocResult, Allocator, default_heap};

/// Contiguous growable array whose storage comes from an [`Allocator`]
///
/// Capacity starts at 2 on the first insert and then grows by half each time
/// the array fills. Positions are plain indices; erasing and inserting keep
/// the relative order of every other element.
///
/// # Example
///
/// ```rust
/// use nebula_alloc::allocator::HeapAllocator;
/// use nebula_alloc::collections::DynamicArray;
///
/// let heap = HeapAllocator::new("numbers");
/// let mut numbers = DynamicArray::new_in(&heap);
/// numbers.push_back(1);
/// numbers.push_back(2);
/// numbers.push_back(3);
///
/// assert_eq!(numbers.erase(1), 1);
/// assert_eq!(numbers.as_slice(), &[1, 3]);
/// ```
pub struct DynamicArray<'a, T> {
    buf: RawBuf<'a, T>,
    len: usize,
}

impl<T> DynamicArray<'static, T> {
    /// Creates an empty array on the default heap
    pub fn new() -> Self {
        Self::new_in(default_heap())
    }
}

impl<T> Default for DynamicArray<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> DynamicArray<'a, T> {
    /// Creates an empty array; nothing is allocated until the first insert
    pub fn new_in(allocator: &'a dyn Allocator) -> Self {
        Self {
            buf: RawBuf::new_in(allocator),
            len: 0,
        }
    }

    /// Creates an array with room for `capacity` elements
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the storage.
    pub fn with_capacity_in(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        Self::try_with_capacity_in(capacity, allocator).unwrap_or_else(|e| allocation_failure(e))
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in)
    pub fn try_with_capacity_in(
        capacity: usize,
        allocator: &'a dyn Allocator,
    ) -> AllocResult<Self> {
        Ok(Self {
            buf: RawBuf::with_capacity_in(capacity, allocator)?,
            len: 0,
        })
    }

    /// The allocator backing this array
    #[inline]
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.buf.allocator()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; the pointer is
        // non-null and aligned even when nothing is allocated.
        unsafe { core::slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees uniqueness.
        unsafe { core::slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }

    /// Reserves room for at least `additional` more elements
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the storage.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .unwrap_or_else(|e| allocation_failure(e));
    }

    /// Fallible form of [`reserve`](Self::reserve)
    pub fn try_reserve(&mut self, additional: usize) -> AllocResult<()> {
        self.buf.reserve(self.len, additional)
    }

    /// Appends `value` at the end
    ///
    /// # Panics
    /// Panics if growth is needed and the allocator is out of memory.
    pub fn push_back(&mut self, value: T) {
        self.try_push_back(value)
            .unwrap_or_else(|e| allocation_failure(e));
    }

    /// Appends `value` at the end, returning the allocator's error on failure
    pub fn try_push_back(&mut self, value: T) -> AllocResult<()> {
        if self.len == self.buf.capacity() {
            self.buf.reserve(self.len, 1)?;
        }
        // SAFETY: len < capacity after the reserve above.
        unsafe { self.buf.ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last element
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was initialized and is now outside the live prefix.
        Some(unsafe { self.buf.ptr().add(self.len).read() })
    }

    /// Inserts `value` at `index`, shifting later elements right
    ///
    /// `index == len` appends.
    ///
    /// # Panics
    /// - Panics if `index > len`
    /// - Panics if growth is needed and the allocator is out of memory
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        self.try_insert(index, value)
            .unwrap_or_else(|e| allocation_failure(e));
    }

    /// Fallible form of [`insert`](Self::insert); still panics on a bad index
    #[track_caller]
    pub fn try_insert(&mut self, index: usize, value: T) -> AllocResult<()> {
        let len = self.len;
        assert!(
            index <= len,
            "insertion index (is {index}) should be <= len (is {len})"
        );

        if len == self.buf.capacity() {
            self.buf.reserve(len, 1)?;
        }

        // SAFETY: capacity > len, so [index, len] fits; `copy` handles the
        // overlapping shift toward the tail.
        unsafe {
            let slot = self.buf.ptr().add(index);
            ptr::copy(slot, slot.add(1), len - index);
            slot.write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting later elements left
    ///
    /// # Panics
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn remove_at(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "removal index (is {index}) should be < len (is {len})");

        // SAFETY: index < len; the value is read out before its slot is
        // overwritten by the shift.
        unsafe {
            let slot = self.buf.ptr().add(index);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, len - index - 1);
            self.len -= 1;
            value
        }
    }

    /// Drops the element at `index` and returns the index of its successor
    ///
    /// The successor now occupies `index`; when the tail was erased the
    /// result equals the new `len`.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn erase(&mut self, index: usize) -> usize {
        drop(self.remove_at(index));
        index
    }

    /// Position of the first element equal to `value`
    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|item| item == value)
    }

    /// Erases the first element equal to `value`; returns whether one was found
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.index_of(value) {
            Some(index) => {
                self.erase(index);
                true
            }
            None => false,
        }
    }

    /// Drops every element, keeping the allocated capacity
    pub fn clear(&mut self) {
        let live: *mut [T] = self.as_mut_slice();
        // Reset first so a panicking destructor cannot cause a double drop.
        self.len = 0;
        // SAFETY: the slice covered exactly the initialized prefix.
        unsafe { ptr::drop_in_place(live) };
    }

    /// Moves the contents out, leaving this array empty on the same allocator
    pub fn take(&mut self) -> Self {
        let len = core::mem::replace(&mut self.len, 0);
        Self {
            buf: self.buf.take(),
            len,
        }
    }

    /// Deep copy on the same allocator, sized to the live prefix
    pub fn try_clone(&self) -> AllocResult<Self>
    where
        T: Clone,
    {
        let mut copy = Self::try_with_capacity_in(self.len, self.allocator())?;
        for item in self.iter() {
            copy.try_push_back(item.clone())?;
        }
        Ok(copy)
    }
}

impl<T> Drop for DynamicArray<'_, T> {
    fn drop(&mut self) {
        // SAFETY: drops exactly the initialized prefix; RawBuf frees the block.
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

impl<T> Deref for DynamicArray<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynamicArray<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone> Clone for DynamicArray<'_, T> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| allocation_failure(e))
    }
}

impl<T: PartialEq> PartialEq for DynamicArray<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynamicArray<'_, T> {}

impl<T: PartialEq> PartialEq<[T]> for DynamicArray<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for DynamicArray<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<'s, T> IntoIterator for &'s DynamicArray<'_, T> {
    type Item = &'s T;
    type IntoIter = core::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'s, T> IntoIterator for &'s mut DynamicArray<'_, T> {
    type Item = &'s mut T;
    type IntoIter = core::slice::IterMut<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
