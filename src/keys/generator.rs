//! Key generators
//!
//! Random candidate keys drawn from a case-sensitive alphanumeric alphabet.

use rand::Rng;

/// Characters a generated key may contain
pub const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Source of candidate document keys
///
/// Implementations have no side effects on any store. Uniqueness is the
/// allocator's job, not the generator's.
pub trait KeyGenerator: Send + Sync {
    /// Return a candidate key of exactly `length` characters
    fn create_key(&self, length: usize) -> String;
}

/// Generator backed by the thread-local RNG (not cryptographically secure)
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn create_key(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect()
    }
}
