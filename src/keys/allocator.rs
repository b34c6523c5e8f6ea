//! Key allocator
//!
//! Retries generator output against the backend until an unused key is found.

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{Result, StashError};
use super::KeyGenerator;

/// Hands out keys that were unoccupied at the moment they were probed
///
/// The probe is a skip-expire read, so allocation never refreshes the
/// time-to-live of an existing document. There is no reservation: two
/// allocators racing on the same candidate can both succeed.
pub struct KeyAllocator {
    generator: Arc<dyn KeyGenerator>,
    key_length: usize,
    max_attempts: u32,
}

impl KeyAllocator {
    /// Create an allocator producing `key_length` keys with at most `max_attempts` probes
    pub fn new(generator: Arc<dyn KeyGenerator>, key_length: usize, max_attempts: u32) -> Self {
        Self {
            generator,
            key_length,
            max_attempts,
        }
    }

    /// Find a key for which `backend.exists(key)` was false
    ///
    /// Candidates the backend reserves for its index count as collisions.
    /// Fails with `KeyspaceExhausted` once `max_attempts` candidates all
    /// collided. Backend failures other than absence are propagated.
    pub fn allocate(&self, backend: &dyn Backend) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.create_key(self.key_length);
            if backend.check_key(&candidate).is_err() {
                tracing::debug!(key = %candidate, attempt, "reserved key, retrying");
                continue;
            }
            if !backend.exists(&candidate)? {
                tracing::debug!(key = %candidate, attempt, "allocated key");
                return Ok(candidate);
            }
            tracing::debug!(key = %candidate, attempt, "key collision, retrying");
        }

        tracing::warn!(attempts = self.max_attempts, "key allocation gave up");
        Err(StashError::KeyspaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Length of the keys this allocator produces
    pub fn key_length(&self) -> usize {
        self.key_length
    }
}
