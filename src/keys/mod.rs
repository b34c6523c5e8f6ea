//! Keys Module
//!
//! Document key generation and collision-free allocation.
//!
//! ## Responsibilities
//! - Produce candidate keys of a configured length
//! - Probe the backend until an unoccupied key is found
//! - Bound the number of probes so an exhausted keyspace fails loudly

mod generator;
mod allocator;

pub use generator::{KeyGenerator, RandomKeyGenerator, KEY_ALPHABET};
pub use allocator::KeyAllocator;
