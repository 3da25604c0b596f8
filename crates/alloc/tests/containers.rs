//! Container behavior over each allocator strategy

use nebula_alloc::allocator::{Allocator, HeapAllocator, LinearAllocator};
use nebula_alloc::collections::{DynamicArray, DynamicString, RobinHashMap};
use nebula_alloc::config::AllocatorConfig;

#[test]
fn test_array_erase_scenario() {
    let heap = HeapAllocator::new("array");
    let mut array = DynamicArray::new_in(&heap);
    array.push_back(1);
    array.push_back(2);
    array.push_back(3);

    array.erase(1);
    assert_eq!(array.as_slice(), &[1, 3]);
    assert_eq!(array.len(), 2);
}

#[test]
fn test_array_of_strings_on_arena() {
    let mut arena = LinearAllocator::new("parse", 64 * 1024).unwrap();
    {
        let mut tokens = DynamicArray::new_in(&arena);
        for word in "let x = 42 ;".split(' ') {
            tokens.push_back(DynamicString::from_str_in(word, &arena));
        }

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[3], "42");
        assert!(tokens.iter().all(|token| token.as_bytes_with_nul().ends_with(&[0])));
        assert_eq!(tokens.index_of(&DynamicString::from_str_in("=", &arena)), Some(2));
    }
    assert!(arena.allocated_bytes() > 0);
    arena.clear();
    assert_eq!(arena.allocated_bytes(), 0);
}

#[test]
fn test_map_scenario() {
    let heap = HeapAllocator::new("map");
    let mut map = RobinHashMap::with_capacity_in(8, &heap);
    assert_eq!(map.max_count(), 7);

    map.insert(DynamicString::from_str_in("a", &heap), 1);
    map.insert(DynamicString::from_str_in("b", &heap), 2);
    map.insert(DynamicString::from_str_in("c", &heap), 3);

    assert_eq!(map.get(&DynamicString::from_str_in("b", &heap)), Some(&2));
    assert_eq!(map.get(&DynamicString::from_str_in("z", &heap)), None);
}

#[test]
fn test_map_overflow_is_reported_by_try_insert() {
    let heap = HeapAllocator::new("map");
    let mut map = RobinHashMap::with_capacity_in(8, &heap);
    for (value, key) in ["a", "b", "c", "d", "e", "f", "g"].into_iter().enumerate() {
        map.insert(key, value);
    }

    let err = map.try_insert("h", 7).unwrap_err();
    assert_eq!(err.code(), "MEM:TABLE:FULL");
    assert_eq!(map.len(), 7);
    assert_eq!(map.get("h"), None);
}

#[test]
#[should_panic(expected = "Hash table full")]
fn test_map_overflow_panics() {
    let heap = HeapAllocator::new("map");
    let mut map = RobinHashMap::with_capacity_in(8, &heap);
    for key in 0..8u32 {
        map.insert(key, key);
    }
}

#[test]
#[should_panic(expected = "exhausted")]
fn test_array_growth_past_arena_is_fatal() {
    let arena = LinearAllocator::with_config("tiny", 32, AllocatorConfig::silent()).unwrap();
    let mut array = DynamicArray::new_in(&arena);
    for value in 0..64u64 {
        array.push_back(value);
    }
}

#[test]
fn test_string_append_forms() {
    let heap = HeapAllocator::new("text");
    let mut path = DynamicString::new_in(&heap);
    path.append_str("assets");
    path.append_byte(b'/');
    path.append_cstr(c"textures");
    path.append_bytes(b"/");
    path.append(&DynamicString::from_str_in("stone.png", &heap));

    assert_eq!(path, "assets/textures/stone.png");
    assert_eq!(path.as_c_str().unwrap().to_bytes(), path.as_bytes());
}

#[test]
fn test_map_remove_then_reinsert() {
    let heap = HeapAllocator::new("map");
    let mut map = RobinHashMap::with_capacity_in(16, &heap);
    for key in 0..14u32 {
        map.insert(key, key);
    }
    for key in (0..14u32).step_by(2) {
        assert_eq!(map.remove(&key), Some(key));
    }
    assert_eq!(map.len(), 7);
    for key in 100..107u32 {
        map.insert(key, key);
    }
    for key in (1..14u32).step_by(2).chain(100..107) {
        assert_eq!(map.get(&key), Some(&key), "key {key}");
    }
    for key in (0..14u32).step_by(2) {
        assert_eq!(map.get(&key), None);
    }
}

#[test]
fn test_containers_on_default_heap() {
    let mut numbers = DynamicArray::new();
    numbers.extend(1..=4);
    let mut label = DynamicString::new();
    label.append_str("sum");

    assert_eq!(numbers.iter().sum::<i32>(), 10);
    assert_eq!(label.as_str(), Some("sum"));
}
