//! In-memory store
//!
//! HashMap-based [`ListStore`] behind a `RwLock`, with lazy expiration.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::{Result, StashError};
use super::pattern::compile as compile_pattern;
use super::ListStore;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// In-process key/list store
///
/// Expired entries are treated as absent on read and dropped on the next
/// write that touches them.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    /// Returns `true` if no live key exists
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time-to-live of `key`, if one is armed
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|deadline| deadline - now)
    }

    /// Remove every key
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn wrong_type(key: &str) -> StashError {
        StashError::Store(format!(
            "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
            key
        ))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read();
        match entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(None),
            Some(Entry { value: Value::Bytes(bytes), .. }) => Ok(Some(bytes.clone())),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value.to_vec()),
                expires_at: None,
            },
        );
        Ok(())
    }

    fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn lpush(&self, key: &str, value: &[u8]) -> Result<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::List(list) => {
                list.push_front(value.to_vec());
                Ok(list.len() as u64)
            }
            Value::Bytes(_) => Err(Self::wrong_type(key)),
        }
    }

    fn llen(&self, key: &str) -> Result<u64> {
        let now = Instant::now();
        let entries = self.entries.read();
        match entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(0),
            Some(Entry { value: Value::List(list), .. }) => Ok(list.len() as u64),
            Some(_) => Err(Self::wrong_type(key)),
        }
    }

    fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read();
        let list = match entries.get(key).filter(|e| e.is_live(now)) {
            None => return Ok(Vec::new()),
            Some(Entry { value: Value::List(list), .. }) => list,
            Some(_) => return Err(Self::wrong_type(key)),
        };

        let len = list.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = compile_pattern(pattern)?;
        let now = Instant::now();
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && matcher.is_match(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
