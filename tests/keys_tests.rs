//! Key Tests
//!
//! Tests for key generation and collision-checked allocation.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{memory_indexed_backend, memory_indexed_backend_with, SequenceKeyGenerator};
use docstash::config::IndexedConfig;
use docstash::keys::KEY_ALPHABET;
use docstash::{
    Backend, Config, DocumentService, FileBackend, KeyAllocator, KeyGenerator, ListStore,
    RandomKeyGenerator, StashError,
};
use tempfile::TempDir;

// =============================================================================
// Generator Tests
// =============================================================================

#[test]
fn test_random_key_length_and_alphabet() {
    let generator = RandomKeyGenerator::new();

    for length in [1, 10, 64] {
        let key = generator.create_key(length);
        assert_eq!(key.len(), length);
        assert!(key.bytes().all(|b| KEY_ALPHABET.contains(&b)));
    }
}

#[test]
fn test_random_keys_vary() {
    let generator = RandomKeyGenerator::new();
    let keys: HashSet<String> = (0..100).map(|_| generator.create_key(10)).collect();

    // 62^10 possibilities, a repeat here means the RNG is broken
    assert_eq!(keys.len(), 100);
}

// =============================================================================
// Allocator Tests
// =============================================================================

#[test]
fn test_allocate_skips_existing_key() {
    let (_, backend) = memory_indexed_backend();
    backend.put("abc", b"taken").unwrap();

    let generator = Arc::new(SequenceKeyGenerator::new(&["abc", "xyz"], "zzz"));
    let allocator = KeyAllocator::new(generator, 3, 8);

    assert_eq!(allocator.allocate(&backend).unwrap(), "xyz");
}

#[test]
fn test_allocate_skips_reserved_candidates() {
    let (_, backend) = memory_indexed_backend();

    let generator = Arc::new(SequenceKeyGenerator::new(&["a:b", "documents", "abc"], "zzz"));
    let allocator = KeyAllocator::new(generator, 3, 8);

    assert_eq!(allocator.key_length(), 3);
    assert_eq!(allocator.allocate(&backend).unwrap(), "abc");
}

#[test]
fn test_allocate_exhausted() {
    let (_, backend) = memory_indexed_backend();
    backend.put("abc", b"taken").unwrap();

    let generator = Arc::new(SequenceKeyGenerator::new(&[], "abc"));
    let allocator = KeyAllocator::new(generator, 3, 5);

    match allocator.allocate(&backend) {
        Err(StashError::KeyspaceExhausted { attempts }) => assert_eq!(attempts, 5),
        other => panic!("Expected KeyspaceExhausted, got {:?}", other),
    }
}

#[test]
fn test_allocate_does_not_refresh_expiration() {
    let (store, backend) = memory_indexed_backend_with(IndexedConfig {
        mirror_path: None,
        expire: Some(60),
        ..IndexedConfig::default()
    });
    backend.put("abc", b"taken").unwrap();

    let generator = Arc::new(SequenceKeyGenerator::new(&["abc", "def"], "zzz"));
    let allocator = KeyAllocator::new(generator, 3, 8);
    allocator.allocate(&backend).unwrap();

    // The collision probe read "abc" without arming its TTL
    assert!(store.ttl("abc").is_none());
}

#[test]
fn test_allocate_on_file_backend() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::open_path(dir.path());
    backend.put("first", b"one").unwrap();

    let generator = Arc::new(SequenceKeyGenerator::new(&["first", "second"], "zzz"));
    let allocator = KeyAllocator::new(generator, 6, 4);

    assert_eq!(allocator.allocate(&backend).unwrap(), "second");
}

#[test]
fn test_allocate_propagates_store_errors() {
    let (store, backend) = memory_indexed_backend();
    // A list under the candidate key makes the probe fail with WRONGTYPE
    store.lpush("abc", b"x").unwrap();

    let generator = Arc::new(SequenceKeyGenerator::new(&["abc"], "zzz"));
    let allocator = KeyAllocator::new(generator, 3, 8);

    match allocator.allocate(&backend) {
        Err(StashError::Store(message)) => assert!(message.starts_with("WRONGTYPE")),
        other => panic!("Expected store error, got {:?}", other),
    }
}

// =============================================================================
// Service Creation Tests
// =============================================================================

#[test]
fn test_create_returns_unused_key() {
    let (_, backend) = memory_indexed_backend();
    let backend: Arc<dyn Backend> = Arc::new(backend);
    backend.put("abc", b"already here").unwrap();

    let config = Config::builder().key_length(3).build();
    let generator = Arc::new(SequenceKeyGenerator::new(&["abc", "abd"], "zzz"));
    let service = DocumentService::with_key_generator(&config, Arc::clone(&backend), generator);

    let key = service.create("fresh", &[]).unwrap();
    assert_eq!(key, "abd");
    assert_eq!(&service.get_raw("abc", true).unwrap()[..], b"already here");
    assert_eq!(&service.get_raw("abd", true).unwrap()[..], b"fresh");
}

#[test]
fn test_create_many_random_keys() {
    let (store, backend) = memory_indexed_backend();
    let config = Config::builder().key_length(10).build();
    let service = DocumentService::new(&config, Arc::new(backend));

    let keys: HashSet<String> = (0..50)
        .map(|i| service.create(format!("doc {}", i), &[]).unwrap())
        .collect();

    assert_eq!(keys.len(), 50);
    for key in &keys {
        assert_eq!(key.len(), 10);
        assert!(store.get(key).unwrap().is_some());
    }
}
