//! Null-terminated byte string over a borrowed allocator
//!
//! Once storage exists, the byte after the last character is always `0`, so
//! the buffer can be handed to C-style consumers without copying. Every
//! append funnels into [`DynamicString::try_append_bytes`].

use core::ffi::CStr;
use core::fmt;
use core::hash::{Hash, Hasher};

use super::allocation_failure;
use super::hash::djb2;
use super::raw::RawBuf;
use crate::allocator::{AllocResult, Allocator, default_heap};

/// Growable byte string with a maintained null terminator
///
/// Content is bytes, not necessarily UTF-8. Equality compares content only,
/// never capacity.
///
/// # Example
///
/// ```rust
/// use nebula_alloc::allocator::HeapAllocator;
/// use nebula_alloc::collections::DynamicString;
///
/// let heap = HeapAllocator::new("text");
/// let mut greeting = DynamicString::from_str_in("hello", &heap);
/// greeting.append_byte(b',');
/// greeting.append_str(" world");
///
/// assert_eq!(greeting, "hello, world");
/// assert_eq!(greeting.as_bytes_with_nul().last(), Some(&0));
/// ```
pub struct DynamicString<'a> {
    buf: RawBuf<'a, u8>,
    len: usize,
}

impl DynamicString<'static> {
    /// Creates an empty string on the default heap
    pub fn new() -> Self {
        Self::new_in(default_heap())
    }
}

impl Default for DynamicString<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DynamicString<'a> {
    /// Creates an empty string; nothing is allocated until the first append
    pub fn new_in(allocator: &'a dyn Allocator) -> Self {
        Self {
            buf: RawBuf::new_in(allocator),
            len: 0,
        }
    }

    /// Creates an empty string with room for `capacity` bytes plus terminator
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the storage.
    pub fn with_capacity_in(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        let mut string = Self::new_in(allocator);
        string
            .reserve_total(capacity)
            .unwrap_or_else(|e| allocation_failure(e));
        string
    }

    /// Creates a string holding a copy of `text`
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the storage.
    pub fn from_str_in(text: &str, allocator: &'a dyn Allocator) -> Self {
        Self::try_from_str_in(text, allocator).unwrap_or_else(|e| allocation_failure(e))
    }

    /// Fallible form of [`from_str_in`](Self::from_str_in)
    pub fn try_from_str_in(text: &str, allocator: &'a dyn Allocator) -> AllocResult<Self> {
        let mut string = Self::new_in(allocator);
        string.reserve_total(text.len())?;
        string.try_append_bytes(text.as_bytes())?;
        Ok(string)
    }

    #[inline]
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.buf.allocator()
    }

    /// Length in bytes, terminator excluded
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that fit without growing, terminator excluded
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity().saturating_sub(1)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if !self.buf.is_allocated() {
            return &[];
        }
        // SAFETY: [0, len) is initialized whenever storage exists.
        unsafe { core::slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// Content followed by the terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if !self.buf.is_allocated() {
            return b"\0";
        }
        // SAFETY: the terminator at `len` is initialized, so len + 1 bytes are.
        unsafe { core::slice::from_raw_parts(self.buf.ptr(), self.len + 1) }
    }

    /// Content as UTF-8, if it is valid
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Content as a C string, if it has no interior null byte
    pub fn as_c_str(&self) -> Option<&CStr> {
        CStr::from_bytes_with_nul(self.as_bytes_with_nul()).ok()
    }

    /// DJB2 hash of the content
    pub fn djb2_hash(&self) -> u32 {
        djb2(self.as_bytes())
    }

    /// Appends raw bytes; the routine every other append goes through
    pub fn try_append_bytes(&mut self, bytes: &[u8]) -> AllocResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        // One extra slot for the terminator.
        self.buf.reserve(self.len, bytes.len() + 1)?;

        // SAFETY: capacity >= len + bytes.len() + 1 after the reserve, and
        // `bytes` cannot alias our exclusively borrowed buffer.
        unsafe {
            let end = self.buf.ptr().add(self.len);
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), end, bytes.len());
            end.add(bytes.len()).write(0);
        }
        self.len += bytes.len();
        Ok(())
    }

    /// Appends raw bytes
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the storage.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.try_append_bytes(bytes)
            .unwrap_or_else(|e| allocation_failure(e));
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.append_bytes(&[byte]);
    }

    /// Appends the content of a C string, without its terminator
    pub fn append_cstr(&mut self, text: &CStr) {
        self.append_bytes(text.to_bytes());
    }

    pub fn append_str(&mut self, text: &str) {
        self.append_bytes(text.as_bytes());
    }

    pub fn append(&mut self, other: &DynamicString<'_>) {
        self.append_bytes(other.as_bytes());
    }

    /// Empties the string, keeping its storage
    pub fn clear(&mut self) {
        self.len = 0;
        if self.buf.is_allocated() {
            // SAFETY: capacity >= 1 whenever storage exists.
            unsafe { self.buf.ptr().write(0) };
        }
    }

    /// Moves the contents out, leaving this string empty on the same allocator
    pub fn take(&mut self) -> Self {
        let len = core::mem::replace(&mut self.len, 0);
        Self {
            buf: self.buf.take(),
            len,
        }
    }

    /// Deep copy on the same allocator
    pub fn try_clone(&self) -> AllocResult<Self> {
        let mut copy = Self::new_in(self.allocator());
        copy.reserve_total(self.len)?;
        copy.try_append_bytes(self.as_bytes())?;
        Ok(copy)
    }

    /// Ensures storage for `total` content bytes plus the terminator
    fn reserve_total(&mut self, total: usize) -> AllocResult<()> {
        if total == 0 {
            return Ok(());
        }
        let was_allocated = self.buf.is_allocated();
        let additional = total.saturating_add(1).saturating_sub(self.len);
        self.buf.reserve_exact(self.len, additional)?;
        if !was_allocated {
            // SAFETY: storage now exists with capacity >= 1.
            unsafe { self.buf.ptr().write(0) };
        }
        Ok(())
    }
}

impl Clone for DynamicString<'_> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| allocation_failure(e))
    }
}

impl PartialEq for DynamicString<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for DynamicString<'_> {}

impl PartialEq<str> for DynamicString<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for DynamicString<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

/// Hashes like `str`, so a string and its text land in the same bucket.
/// Under [`BuildDjb2`](super::hash::BuildDjb2) both hash to `djb2(content)`.
impl Hash for DynamicString<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.as_bytes());
        state.write_u8(0xff);
    }
}

impl fmt::Display for DynamicString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&String::from_utf8_lossy(self.as_bytes()), f)
    }
}

impl fmt::Debug for DynamicString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.as_bytes()), f)
    }
}

impl fmt::Write for DynamicString<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.try_append_bytes(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
