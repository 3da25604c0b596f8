//! DJB2 hashing
//!
//! `h = h * 33 + byte`, seeded with 5381, in wrapping 32-bit arithmetic.
//!
//! `str` finishes its `Hash` output with a `0xff` separator byte.
//! [`Djb2Hasher`] drops a `0xff` written directly after a byte slice, so text
//! keys hash to exactly `djb2(content)`.

use core::hash::{BuildHasher, Hasher};

/// Initial DJB2 state
pub const DJB2_SEED: u32 = 5381;

/// Byte `str` appends to its `Hash` output
const STR_SEPARATOR: u8 = 0xff;

/// Hashes `bytes` with DJB2
///
/// ```
/// use nebula_alloc::collections::djb2;
///
/// assert_eq!(djb2(b""), 5381);
/// assert_eq!(djb2(b"a"), 5381 * 33 + 97);
/// ```
#[inline]
#[must_use]
pub const fn djb2(bytes: &[u8]) -> u32 {
    let mut hash = DJB2_SEED;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash.wrapping_mul(33).wrapping_add(bytes[i] as u32);
        i += 1;
    }
    hash
}

/// [`Hasher`] running DJB2 over everything written to it, minus the `str`
/// separator
#[derive(Debug, Clone, Copy)]
pub struct Djb2Hasher {
    state: u32,
    after_bytes: bool,
}

impl Djb2Hasher {
    #[inline]
    fn mix(&mut self, byte: u8) {
        self.state = self.state.wrapping_mul(33).wrapping_add(u32::from(byte));
    }
}

impl Default for Djb2Hasher {
    fn default() -> Self {
        Self {
            state: DJB2_SEED,
            after_bytes: false,
        }
    }
}

impl Hasher for Djb2Hasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.mix(byte);
        }
        self.after_bytes = true;
    }

    #[inline]
    fn write_u8(&mut self, byte: u8) {
        let separator = core::mem::replace(&mut self.after_bytes, false) && byte == STR_SEPARATOR;
        if !separator {
            self.mix(byte);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// Builds [`Djb2Hasher`]s; the default hasher of
/// [`RobinHashMap`](super::RobinHashMap)
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildDjb2;

impl BuildHasher for BuildDjb2 {
    type Hasher = Djb2Hasher;

    fn build_hasher(&self) -> Djb2Hasher {
        Djb2Hasher::default()
    }
}
