//! Fixed-capacity Robin Hood hash map
//!
//! Open addressing with linear probing over a bucket block drawn from an
//! [`Allocator`]. The bucket count is fixed at construction and the map never
//! rehashes: at most `floor(0.9 * capacity)` entries fit, and inserting past
//! that is a contract violation.
//!
//! Every bucket is `Empty`, `Occupied` or `Tombstone`. Removal turns an
//! occupied bucket into a tombstone that keeps its hash, so the probe
//! sequences of other keys stay intact. Tombstones never become `Empty`
//! again.
//!
//! Insertion follows the Robin Hood rule: an incoming entry that has probed
//! further than the resident takes its bucket and the resident continues
//! probing. Lookups use the same invariant to stop early.

use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::{error, trace};

use super::allocation_failure;
use super::hash::BuildDjb2;
use crate::allocator::{AllocResult, Allocator};
use crate::error::{MemoryError, MemoryResult};

/// Maximum load factor, in percent
pub const MAX_LOAD_PERCENT: usize = 90;

/// Stored hashes keep 31 bits
const HASH_MASK: u32 = 0x7FFF_FFFF;

enum Bucket<K, V> {
    Empty,
    Occupied { hash: u32, key: K, value: V },
    Tombstone { hash: u32 },
}

/// Number of entries a table of `capacity` buckets accepts
#[inline]
pub const fn max_count_for(capacity: usize) -> usize {
    capacity / 100 * MAX_LOAD_PERCENT + capacity % 100 * MAX_LOAD_PERCENT / 100
}

/// Fixed-capacity open-addressing hash map with Robin Hood displacement
///
/// # Example
///
/// ```rust
/// use nebula_alloc::allocator::HeapAllocator;
/// use nebula_alloc::collections::RobinHashMap;
///
/// let heap = HeapAllocator::new("symbols");
/// let mut map = RobinHashMap::with_capacity_in(8, &heap);
/// assert_eq!(map.max_count(), 7);
///
/// map.insert("a", 1);
/// map.insert("b", 2);
/// assert_eq!(map.get("b"), Some(&2));
/// assert_eq!(map.get("z"), None);
/// ```
pub struct RobinHashMap<'a, K, V, S = BuildDjb2> {
    buckets: NonNull<Bucket<K, V>>,
    capacity: usize,
    count: usize,
    max_count: usize,
    max_probe: usize,
    // Set when a full lap forced a tombstone claim that may break the
    // early-exit ordering; lookups then scan up to `max_probe`.
    relaxed: bool,
    hash_builder: S,
    allocator: &'a dyn Allocator,
    _marker: PhantomData<Bucket<K, V>>,
}

impl<'a, K, V> RobinHashMap<'a, K, V> {
    /// Creates a DJB2-hashed map with exactly `capacity` buckets
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the bucket block.
    pub fn with_capacity_in(capacity: usize, allocator: &'a dyn Allocator) -> Self {
        Self::try_with_capacity_in(capacity, allocator).unwrap_or_else(|e| allocation_failure(e))
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in)
    pub fn try_with_capacity_in(
        capacity: usize,
        allocator: &'a dyn Allocator,
    ) -> AllocResult<Self> {
        Self::try_with_capacity_and_hasher_in(capacity, BuildDjb2, allocator)
    }
}

impl<'a, K, V, S> RobinHashMap<'a, K, V, S> {
    /// Creates a map with `capacity` buckets hashing through `hash_builder`
    ///
    /// # Panics
    /// Panics if the allocator cannot provide the bucket block.
    pub fn with_capacity_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        allocator: &'a dyn Allocator,
    ) -> Self {
        Self::try_with_capacity_and_hasher_in(capacity, hash_builder, allocator)
            .unwrap_or_else(|e| allocation_failure(e))
    }

    /// Fallible form of [`with_capacity_and_hasher_in`](Self::with_capacity_and_hasher_in)
    pub fn try_with_capacity_and_hasher_in(
        capacity: usize,
        hash_builder: S,
        allocator: &'a dyn Allocator,
    ) -> AllocResult<Self> {
        let buckets = if capacity == 0 {
            NonNull::dangling()
        } else {
            let layout = Layout::array::<Bucket<K, V>>(capacity)
                .map_err(|_| MemoryError::size_overflow("hash map bucket count"))?;
            let buckets = allocator.allocate(layout)?.cast::<Bucket<K, V>>();
            for i in 0..capacity {
                // SAFETY: i < capacity, inside the fresh block.
                unsafe { buckets.add(i).write(Bucket::Empty) };
            }
            buckets
        };

        #[cfg(feature = "logging")]
        trace!(capacity, allocator = allocator.name(), "created robin hash map");

        Ok(Self {
            buckets,
            capacity,
            count: 0,
            max_count: max_count_for(capacity),
            max_probe: 0,
            relaxed: false,
            hash_builder,
            allocator,
            _marker: PhantomData,
        })
    }

    /// Number of live entries
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of buckets, fixed for the map's lifetime
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest number of entries the map accepts
    #[inline]
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Longest probe distance any entry has been placed at
    #[inline]
    pub fn max_probe_distance(&self) -> usize {
        self.max_probe
    }

    /// Number of tombstoned buckets
    pub fn tombstones(&self) -> usize {
        self.buckets()
            .iter()
            .filter(|bucket| matches!(bucket, Bucket::Tombstone { .. }))
            .count()
    }

    #[inline]
    pub fn allocator(&self) -> &'a dyn Allocator {
        self.allocator
    }

    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Iterates entries in bucket order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets().iter(),
            remaining: self.count,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    fn buckets(&self) -> &[Bucket<K, V>] {
        // SAFETY: `capacity` buckets were initialized at construction and
        // stay initialized until drop; a dangling pointer is valid for an
        // empty slice.
        unsafe { core::slice::from_raw_parts(self.buckets.as_ptr(), self.capacity) }
    }

    fn buckets_mut(&mut self) -> &mut [Bucket<K, V>] {
        // SAFETY: as above, with uniqueness from `&mut self`.
        unsafe { core::slice::from_raw_parts_mut(self.buckets.as_ptr(), self.capacity) }
    }

    #[inline]
    fn desired_position(&self, hash: u32) -> usize {
        hash as usize % self.capacity
    }

    #[inline]
    fn probe_distance(&self, position: usize, hash: u32) -> usize {
        (position + self.capacity - self.desired_position(hash)) % self.capacity
    }
}

impl<'a, K, V, S> RobinHashMap<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts `key -> value`
    ///
    /// An existing key has its value replaced and the old value returned;
    /// the entry count does not change.
    ///
    /// # Panics
    /// Panics if the key is new and the map already holds
    /// [`max_count`](Self::max_count) entries.
    #[track_caller]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(error) => {
                #[cfg(feature = "logging")]
                error!(%error, "robin hash map overflow");
                panic!("{error}")
            }
        }
    }

    /// Inserts `key -> value`, reporting a full table as an error
    pub fn try_insert(&mut self, key: K, value: V) -> MemoryResult<Option<V>> {
        let hash = self.hash_key(&key);
        if let Some(index) = self.find_index(hash, &key)
            && let Bucket::Occupied { value: slot, .. } = &mut self.buckets_mut()[index]
        {
            return Ok(Some(mem::replace(slot, value)));
        }

        if self.count >= self.max_count {
            return Err(MemoryError::table_full(self.capacity, self.max_count));
        }

        self.place(hash, key, value);
        self.count += 1;
        Ok(None)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_key(key), key)?;
        match &self.buckets()[index] {
            Bucket::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_key(key), key)?;
        match &mut self.buckets_mut()[index] {
            Bucket::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_index(self.hash_key(key), key).is_some()
    }

    /// Removes `key`, leaving a tombstone in its bucket
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(self.hash_key(key), key)?;
        let bucket = &mut self.buckets_mut()[index];
        let hash = match *bucket {
            Bucket::Occupied { hash, .. } => hash,
            _ => return None,
        };

        match mem::replace(bucket, Bucket::Tombstone { hash }) {
            Bucket::Occupied { value, .. } => {
                self.count -= 1;
                Some(value)
            }
            _ => None,
        }
    }

    /// 31-bit hash with 0 reserved
    fn hash_key<Q: Hash + ?Sized>(&self, key: &Q) -> u32 {
        let hash = (self.hash_builder.hash_one(key) as u32) & HASH_MASK;
        if hash == 0 { 1 } else { hash }
    }

    fn find_index<Q>(&self, hash: u32, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.capacity == 0 {
            return None;
        }

        let buckets = self.buckets();
        let mut position = self.desired_position(hash);

        for distance in 0..=self.max_probe.min(self.capacity - 1) {
            match &buckets[position] {
                Bucket::Empty => return None,
                Bucket::Tombstone { .. } => {}
                Bucket::Occupied {
                    hash: resident_hash,
                    key: resident,
                    ..
                } => {
                    if *resident_hash == hash && resident.borrow() == key {
                        return Some(position);
                    }
                    if !self.relaxed && distance > self.probe_distance(position, *resident_hash) {
                        return None;
                    }
                }
            }
            position = (position + 1) % self.capacity;
        }
        None
    }

    /// Robin Hood placement of an entry known to be absent
    ///
    /// Requires `count < max_count`, so at least one bucket is not occupied.
    fn place(&mut self, hash: u32, key: K, value: V) {
        debug_assert!(self.count < self.max_count);

        let capacity = self.capacity;
        let mut position = self.desired_position(hash);
        let mut carried = (hash, key, value);
        let mut distance = 0usize;
        let mut steps = 0usize;

        loop {
            let resident_distance = match &self.buckets()[position] {
                Bucket::Empty => None,
                Bucket::Tombstone { hash } | Bucket::Occupied { hash, .. } => {
                    Some(self.probe_distance(position, *hash))
                }
            };

            let bucket = &mut self.buckets_mut()[position];
            match (bucket, resident_distance) {
                (bucket @ Bucket::Empty, _) => {
                    let (hash, key, value) = carried;
                    *bucket = Bucket::Occupied { hash, key, value };
                    self.record_probe(distance, steps);
                    return;
                }
                (bucket @ Bucket::Tombstone { .. }, Some(resident))
                    if distance >= resident || steps >= capacity =>
                {
                    let (hash, key, value) = carried;
                    *bucket = Bucket::Occupied { hash, key, value };
                    if distance < resident {
                        self.relaxed = true;
                    }
                    self.record_probe(distance, steps);
                    return;
                }
                (
                    Bucket::Occupied {
                        hash: resident_hash,
                        key: resident_key,
                        value: resident_value,
                    },
                    Some(resident),
                ) if distance > resident => {
                    mem::swap(resident_hash, &mut carried.0);
                    mem::swap(resident_key, &mut carried.1);
                    mem::swap(resident_value, &mut carried.2);
                    self.record_probe(distance, steps);
                    distance = resident;
                }
                _ => {}
            }

            position = (position + 1) % capacity;
            distance += 1;
            steps += 1;
        }
    }

    /// Tracks the longest probe; once placement has wrapped the table the
    /// distance no longer orders buckets, so early exit is turned off.
    fn record_probe(&mut self, distance: usize, steps: usize) {
        if steps >= self.capacity {
            self.relaxed = true;
        }
        self.max_probe = self.max_probe.max(distance.min(self.capacity - 1));
    }
}

impl<K, V, S> Drop for RobinHashMap<'_, K, V, S> {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }
        // SAFETY: all buckets are initialized; the block came from
        // `self.allocator` and is not used again.
        unsafe {
            core::ptr::drop_in_place(self.buckets_mut() as *mut [Bucket<K, V>]);
            self.allocator.deallocate(self.buckets.cast());
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for RobinHashMap<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over the entries of a [`RobinHashMap`], in bucket order
pub struct Iter<'m, K, V> {
    buckets: core::slice::Iter<'m, Bucket<K, V>>,
    remaining: usize,
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
    type Item = (&'m K, &'m V);

    fn next(&mut self) -> Option<Self::Item> {
        for bucket in self.buckets.by_ref() {
            if let Bucket::Occupied { key, value, .. } = bucket {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'m, K, V, S> IntoIterator for &'m RobinHashMap<'_, K, V, S> {
    type Item = (&'m K, &'m V);
    type IntoIter = Iter<'m, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use core::hash::Hasher;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    use super::*;
    use crate::allocator::HeapAllocator;
    use crate::collections::DynamicString;
    use crate::collections::hash::djb2;
    use crate::config::AllocatorConfig;

    /// Sends every key to the same bucket
    #[derive(Default, Clone, Copy)]
    struct Collide;

    struct CollideHasher;

    impl Hasher for CollideHasher {
        fn write(&mut self, _bytes: &[u8]) {}

        fn finish(&self) -> u64 {
            3
        }
    }

    impl BuildHasher for Collide {
        type Hasher = CollideHasher;

        fn build_hasher(&self) -> CollideHasher {
            CollideHasher
        }
    }

    /// Hashes a `u64` key to itself
    #[derive(Default, Clone, Copy)]
    struct Identity;

    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn write(&mut self, _bytes: &[u8]) {
            unreachable!("identity hasher only takes u64");
        }

        fn write_u64(&mut self, value: u64) {
            self.0 = value;
        }

        fn finish(&self) -> u64 {
            self.0
        }
    }

    impl BuildHasher for Identity {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher::default()
        }
    }

    #[test]
    fn test_capacity_eight_scenario() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(8, &heap);
        assert_eq!(map.max_count(), 7);

        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("c"), Some(&3));
        assert_eq!(map.get("z"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    #[should_panic(expected = "Hash table full")]
    fn test_overflow_is_fatal() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(8, &heap);
        for key in ["a", "b", "c", "d", "e", "f", "g"] {
            map.insert(key, 0);
        }
        assert_eq!(map.len(), 7);
        map.insert("h", 0);
    }

    #[test]
    fn test_try_insert_reports_full() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(4, &heap);
        for key in 0u32..3 {
            map.insert(key, key);
        }
        let err = map.try_insert(99, 0).unwrap_err();
        assert_eq!(
            err,
            MemoryError::TableFull {
                capacity: 4,
                max_count: 3
            }
        );
        // replacing an existing key still works at the limit
        assert_eq!(map.try_insert(1, 10), Ok(Some(1)));
        assert_eq!(map.get(&1), Some(&10));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_max_count_rounds_down() {
        assert_eq!(max_count_for(0), 0);
        assert_eq!(max_count_for(1), 0);
        assert_eq!(max_count_for(8), 7);
        assert_eq!(max_count_for(10), 9);
        assert_eq!(max_count_for(16), 14);
        assert_eq!(max_count_for(1000), 900);
    }

    #[test]
    fn test_hash_never_zero_or_tombstone_bit() {
        struct Fixed(u64);
        impl BuildHasher for Fixed {
            type Hasher = IdentityHasher;
            fn build_hasher(&self) -> IdentityHasher {
                IdentityHasher(self.0)
            }
        }

        let heap = HeapAllocator::new("map");
        let zero: RobinHashMap<'_, (), (), _> =
            RobinHashMap::with_capacity_and_hasher_in(4, Fixed(0), &heap);
        assert_eq!(zero.hash_key(&()), 1);

        let high: RobinHashMap<'_, (), (), _> =
            RobinHashMap::with_capacity_and_hasher_in(4, Fixed(0x8000_0000), &heap);
        assert_eq!(high.hash_key(&()), 1);

        let wide: RobinHashMap<'_, (), (), _> =
            RobinHashMap::with_capacity_and_hasher_in(4, Fixed(0xFFFF_FFFF_8000_0005), &heap);
        assert_eq!(wide.hash_key(&()), 5);
    }

    #[test]
    fn test_text_keys_hash_to_djb2_of_content() {
        let heap = HeapAllocator::new("map");
        let map: RobinHashMap<'_, &str, i32> = RobinHashMap::with_capacity_in(8, &heap);
        assert_eq!(map.hash_key("a"), djb2(b"a") & HASH_MASK);
        assert_eq!(map.hash_key("config.toml"), djb2(b"config.toml") & HASH_MASK);

        let name = DynamicString::from_str_in("config.toml", &heap);
        let owned: RobinHashMap<'_, DynamicString<'_>, i32> =
            RobinHashMap::with_capacity_in(8, &heap);
        assert_eq!(owned.hash_key(&name), name.djb2_hash() & HASH_MASK);
        assert_eq!(owned.hash_key(&name), map.hash_key("config.toml"));
    }

    #[test]
    fn test_collisions_probe_linearly() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_and_hasher_in(16, Collide, &heap);
        for key in 0..10u32 {
            map.insert(key, key * 2);
        }
        assert_eq!(map.max_probe_distance(), 9);
        for key in 0..10u32 {
            assert_eq!(map.get(&key), Some(&(key * 2)));
        }
        assert_eq!(map.get(&10), None);
    }

    #[test]
    fn test_robin_hood_displacement() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_and_hasher_in(10, Identity, &heap);
        // 10 and 20 both want bucket 0; 1 wants bucket 1
        map.insert(10u64, "ten");
        map.insert(1u64, "one");
        map.insert(20u64, "twenty");

        // 20 reached bucket 1 at distance 1, beating its resident (distance
        // 0), which moved on to bucket 2
        let order: Vec<u64> = map.keys().copied().collect();
        assert_eq!(order, vec![10, 20, 1]);
        assert_eq!(map.max_probe_distance(), 1);
        assert_eq!(map.get(&1), Some(&"one"));
    }

    #[test]
    fn test_remove_leaves_tombstone() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_and_hasher_in(8, Collide, &heap);
        for key in 0..4u32 {
            map.insert(key, key);
        }

        assert_eq!(map.remove(&1), Some(1));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 3);
        assert_eq!(map.tombstones(), 1);

        // keys past the tombstone are still reachable
        assert_eq!(map.get(&2), Some(&2));
        assert_eq!(map.get(&3), Some(&3));

        // the tombstone is reused, never reverted to empty
        map.insert(7, 7);
        assert_eq!(map.tombstones(), 0);
        assert_eq!(map.get(&7), Some(&7));
    }

    #[test]
    fn test_insert_existing_key_replaces() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(8, &heap);
        assert_eq!(map.insert("k", 1), None);
        assert_eq!(map.insert("k", 2), Some(1));
        assert_eq!(map.len(), 1);
        *map.get_mut("k").unwrap() += 1;
        assert_eq!(map.get("k"), Some(&3));
        assert!(map.contains_key("k"));
    }

    #[test]
    fn test_zero_capacity() {
        let heap = HeapAllocator::new("map");
        let mut map: RobinHashMap<'_, u32, u32> = RobinHashMap::with_capacity_in(0, &heap);
        assert_eq!(map.get(&1), None);
        assert!(map.try_insert(1, 1).is_err());
        assert_eq!(heap.live_allocations(), 0);
    }

    #[test]
    fn test_drop_releases_entries_and_block() {
        let heap = HeapAllocator::new("map");
        let marker = Rc::new(());
        {
            let mut map = RobinHashMap::with_capacity_in(16, &heap);
            for key in 0..10u32 {
                map.insert(key, Rc::clone(&marker));
            }
            drop(map.remove(&3));
            assert_eq!(Rc::strong_count(&marker), 10);
        }
        assert_eq!(Rc::strong_count(&marker), 1);
        assert_eq!(heap.allocated_bytes(), 0);
    }

    #[test]
    fn test_iteration_covers_every_entry() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(32, &heap);
        for key in 0..20u32 {
            map.insert(key, key + 100);
        }
        let iter = map.iter();
        assert_eq!(iter.len(), 20);

        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
        assert_eq!(map.values().sum::<u32>(), (100..120).sum());
    }

    #[test]
    fn test_debug_output() {
        let heap = HeapAllocator::new("map");
        let mut map = RobinHashMap::with_capacity_in(4, &heap);
        map.insert("only", 1);
        assert_eq!(format!("{map:?}"), r#"{"only": 1}"#);
    }

    #[derive(Debug, Clone)]
    enum MapOp {
        Insert(u64, u32),
        Remove(u64),
    }

    fn map_op_strategy() -> impl Strategy<Value = MapOp> {
        prop_oneof![
            3 => (0u64..64, any::<u32>()).prop_map(|(key, value)| MapOp::Insert(key, value)),
            2 => (0u64..64).prop_map(MapOp::Remove),
        ]
    }

    /// Every occupied bucket sits within `max_probe` of its home bucket
    fn check_distance_bound<K, V, S>(
        map: &RobinHashMap<'_, K, V, S>,
    ) -> Result<(), TestCaseError> {
        let mut occupied = 0;
        for (position, bucket) in map.buckets().iter().enumerate() {
            if let Bucket::Occupied { hash, .. } = bucket {
                occupied += 1;
                prop_assert!(
                    map.probe_distance(position, *hash) <= map.max_probe,
                    "bucket {} at distance {} past max {}",
                    position,
                    map.probe_distance(position, *hash),
                    map.max_probe
                );
            }
        }
        prop_assert_eq!(occupied, map.count);
        Ok(())
    }

    fn replay<S: BuildHasher>(
        mut map: RobinHashMap<'_, u64, u32, S>,
        ops: &[MapOp],
    ) -> Result<(), TestCaseError> {
        let mut model = HashMap::new();
        for op in ops {
            match *op {
                MapOp::Insert(key, value)
                    if !model.contains_key(&key) && model.len() >= map.max_count() =>
                {
                    prop_assert!(map.try_insert(key, value).is_err());
                }
                MapOp::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                }
                MapOp::Remove(key) => prop_assert_eq!(map.remove(&key), model.remove(&key)),
            }
            prop_assert_eq!(map.len(), model.len());
            check_distance_bound(&map)?;
        }
        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        for key in 0u64..64 {
            prop_assert_eq!(map.contains_key(&key), model.contains_key(&key));
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_distance_bound_under_mixed_ops(
            capacity in 1usize..32,
            hasher in 0u8..3,
            ops in prop::collection::vec(map_op_strategy(), 0..200),
        ) {
            let heap = HeapAllocator::with_config("map", AllocatorConfig::silent());
            match hasher {
                0 => replay(RobinHashMap::with_capacity_in(capacity, &heap), &ops)?,
                1 => {
                    let map = RobinHashMap::with_capacity_and_hasher_in(capacity, Identity, &heap);
                    replay(map, &ops)?
                }
                _ => {
                    let map = RobinHashMap::with_capacity_and_hasher_in(capacity, Collide, &heap);
                    replay(map, &ops)?
                }
            }
            prop_assert_eq!(heap.allocated_bytes(), 0);
        }
    }
}
