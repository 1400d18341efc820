//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the shared key space. It maps keys to typed
//! [`Entry`] values (string or list) and enforces expiry lazily: an entry
//! whose deadline has passed is removed by whichever operation next touches
//! it, and every operation then behaves as if the key had never existed.
//! There is no background sweeper.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards by hash, so operations on keys in
//! different shards never wait on each other. Every compound operation
//! (check-then-evict, read-append-write) runs entirely under one shard lock
//! and is therefore atomic with respect to other operations on the same key.

use crate::storage::value::{Entry, Expiry, StoredValue};
use bytes::Bytes;
use std::collections::hash_map::{self, HashMap};
use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use thiserror::Error;
use tracing::trace;

/// Number of shards for the storage engine.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 64;

/// Errors raised by typed store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The key holds a different kind of value than the operation needs
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,
}

/// Which end of a list a push writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEnd {
    Front,
    Back,
}

impl ListEnd {
    fn push_all(self, items: &mut VecDeque<Bytes>, values: Vec<Bytes>) {
        match self {
            ListEnd::Back => items.extend(values),
            ListEnd::Front => {
                for value in values {
                    items.push_front(value);
                }
            }
        }
    }
}

type ShardMap = HashMap<Bytes, Entry>;

/// A single shard containing a portion of the key space.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<ShardMap>,
}

impl Shard {
    // A panic while holding a shard lock cannot leave an entry half-written
    // (every mutation is a single map call or a push onto a list), so the
    // map is still consistent and the poison flag is ignored.
    fn read(&self) -> RwLockReadGuard<'_, ShardMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShardMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The shared key space.
///
/// Wrap it in an `Arc` and hand a clone to every session; all operations take
/// `&self`.
///
/// # Example
///
/// ```
/// use respkv::storage::{Expiry, StorageEngine, StoredValue};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.put(Bytes::from("name"), StoredValue::String(Bytes::from("Ariz")), Expiry::Never);
/// assert_eq!(engine.get_string(b"name"), Ok(Some(Bytes::from("Ariz"))));
///
/// engine.rpush(Bytes::from("queue"), vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
/// assert_eq!(engine.lrange(b"queue", 0, 10).unwrap().len(), 2);
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: lookups (GET, LRANGE, ...)
    read_count: AtomicU64,

    /// Statistics: writes (SET, RPUSH, ...)
    write_count: AtomicU64,

    /// Statistics: explicit removals of live keys
    remove_count: AtomicU64,

    /// Statistics: keys removed because they were found expired
    evicted_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .field("evicted_count", &self.evicted_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            remove_count: AtomicU64::new(0),
            evicted_count: AtomicU64::new(0),
        }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Removes `key` from `map` if its entry is no longer live.
    ///
    /// Must be called with the shard's write lock held.
    fn evict_if_expired(&self, map: &mut ShardMap, key: &[u8], now: Instant) -> bool {
        let expired = map.get(key).is_some_and(|entry| !entry.is_live_at(now));
        if expired {
            map.remove(key);
            self.evicted_count.fetch_add(1, Ordering::Relaxed);
            trace!(key = %String::from_utf8_lossy(key), "Evicted expired key");
        }
        expired
    }

    // ========================================================================
    // Core primitives
    // ========================================================================

    /// Runs `f` against the live value at `key`, or `None` if there is none.
    ///
    /// An expired entry is removed before `f` runs, under the same write lock,
    /// so no other operation can observe it between the check and the removal.
    /// Live entries are read under a shared lock.
    pub fn view<R>(&self, key: &[u8], f: impl FnOnce(Option<&StoredValue>) -> R) -> R {
        self.read_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);

        // Fast path: absent or live, no mutation needed. `now` is always
        // read under the shard lock.
        {
            let data = shard.read();
            let now = Instant::now();
            match data.get(key) {
                None => return f(None),
                Some(entry) if entry.is_live_at(now) => return f(Some(&entry.value)),
                Some(_) => {}
            }
        }

        // Expired - take the write lock and re-check, another session may
        // have replaced or evicted it in between.
        let mut data = shard.write();
        let now = Instant::now();
        self.evict_if_expired(&mut data, key, now);
        f(data.get(key).map(|entry| &entry.value))
    }

    /// Runs `f` against the map slot for `key` under the shard's write lock.
    ///
    /// An expired entry is evicted first, so `f` sees either a live entry
    /// (`Occupied`) or nothing (`Vacant`). Use this for read-modify-write
    /// sequences that must be atomic per key.
    pub fn update<R>(
        &self,
        key: Bytes,
        f: impl FnOnce(hash_map::Entry<'_, Bytes, Entry>) -> R,
    ) -> R {
        self.write_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(&key);
        let mut data = shard.write();
        let now = Instant::now();
        self.evict_if_expired(&mut data, &key, now);
        f(data.entry(key))
    }

    /// Returns a copy of the live value at `key`.
    pub fn get(&self, key: &[u8]) -> Option<StoredValue> {
        self.view(key, |value| value.cloned())
    }

    /// Stores `value` at `key`, discarding whatever was there before
    /// (including a value of another type and its expiry).
    pub fn put(&self, key: Bytes, value: StoredValue, expiry: Expiry) {
        self.write_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(&key);
        shard.write().insert(key, Entry::with_expiry(value, expiry));
    }

    /// Deletes `key`. Idempotent.
    ///
    /// Returns `true` if a live value was removed. Removing an already
    /// expired entry counts as an eviction and returns `false`.
    pub fn remove(&self, key: &[u8]) -> bool {
        let shard = self.get_shard(key);
        let removed = {
            let mut data = shard.write();
            let now = Instant::now();
            data.remove(key).map(|entry| (entry, now))
        };

        match removed {
            Some((entry, now)) if entry.is_live_at(now) => {
                self.remove_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(_) => {
                self.evicted_count.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => false,
        }
    }

    /// Returns `true` if `key` holds a live value.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.view(key, |value| value.is_some())
    }

    /// Returns the number of stored entries.
    ///
    /// Entries that have expired but have not been touched since are still
    /// counted; they disappear from the count once lazily evicted.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            reads: self.read_count.load(Ordering::Relaxed),
            writes: self.write_count.load(Ordering::Relaxed),
            removals: self.remove_count.load(Ordering::Relaxed),
            evictions: self.evicted_count.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // STRING OPERATIONS
    // ========================================================================

    /// Stores a string value with the given expiry.
    pub fn set_string(&self, key: Bytes, value: Bytes, expiry: Expiry) {
        self.put(key, StoredValue::String(value), expiry);
    }

    /// Reads a string value.
    ///
    /// `Ok(None)` if the key is absent or expired, `Err(WrongType)` if it
    /// holds a list.
    pub fn get_string(&self, key: &[u8]) -> Result<Option<Bytes>, StorageError> {
        self.view(key, |value| match value {
            None => Ok(None),
            Some(StoredValue::String(s)) => Ok(Some(s.clone())),
            Some(StoredValue::List(_)) => Err(StorageError::WrongType),
        })
    }

    // ========================================================================
    // LIST OPERATIONS
    // ========================================================================

    /// Appends `values` to the tail of the list at `key`, in order.
    ///
    /// Creates a non-expiring list if the key is absent or expired.
    ///
    /// # Returns
    /// The length of the list after all values were pushed.
    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, StorageError> {
        self.push(key, values, ListEnd::Back)
    }

    /// Inserts `values` at the head of the list at `key`, one after another,
    /// so the last value ends up first.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, StorageError> {
        self.push(key, values, ListEnd::Front)
    }

    fn push(&self, key: Bytes, values: Vec<Bytes>, end: ListEnd) -> Result<usize, StorageError> {
        self.update(key, |slot| match slot {
            hash_map::Entry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                StoredValue::List(items) => {
                    end.push_all(items, values);
                    Ok(items.len())
                }
                StoredValue::String(_) => Err(StorageError::WrongType),
            },
            hash_map::Entry::Vacant(vacant) => {
                // Never leave an empty list behind
                if values.is_empty() {
                    return Ok(0);
                }
                let mut items = VecDeque::with_capacity(values.len());
                end.push_all(&mut items, values);
                let len = items.len();
                vacant.insert(Entry::new(StoredValue::List(items)));
                Ok(len)
            }
        })
    }

    /// Returns the elements of the list at `key` between `start` and `stop`,
    /// both inclusive. See [`resolve_range`] for index handling.
    ///
    /// An absent or expired key reads as an empty list.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Bytes>, StorageError> {
        self.view(key, |value| match value {
            None => Ok(Vec::new()),
            Some(StoredValue::List(items)) => Ok(resolve_range(items.len(), start, stop)
                .map(|range| items.range(range).cloned().collect())
                .unwrap_or_default()),
            Some(StoredValue::String(_)) => Err(StorageError::WrongType),
        })
    }

    /// Returns the length of the list at `key` (0 if absent or expired).
    pub fn llen(&self, key: &[u8]) -> Result<usize, StorageError> {
        self.view(key, |value| match value {
            None => Ok(0),
            Some(StoredValue::List(items)) => Ok(items.len()),
            Some(StoredValue::String(_)) => Err(StorageError::WrongType),
        })
    }

    /// Returns the type of the live value at `key`, or `"none"`.
    pub fn key_type(&self, key: &[u8]) -> &'static str {
        self.view(key, |value| value.map_or("none", StoredValue::type_name))
    }
}

/// Resolves the inclusive index pair `start..=stop` against a list of `len`
/// elements, returning the matching half-open range or `None` when empty.
///
/// Non-negative indices are taken as-is: the range is empty when
/// `start >= len` or `start > stop`, and `stop` is clamped to `len - 1`.
/// Negative indices count from the tail (`-1` is the last element); a start
/// that is still negative after that is clamped to 0.
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<Range<usize>> {
    let len = i64::try_from(len).ok()?;

    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop };

    if start >= len || start > stop {
        return None;
    }

    let stop = stop.min(len - 1);
    Some(start as usize..stop as usize + 1)
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently stored
    pub keys: u64,
    pub reads: u64,
    pub writes: u64,
    pub removals: u64,
    /// Keys removed because they were found expired
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn ttl(ms: u64) -> Expiry {
        Expiry::after(Instant::now(), Duration::from_millis(ms))
    }

    fn list(items: &[&str]) -> Vec<Bytes> {
        items.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("value"), Expiry::Never);
        assert_eq!(engine.get_string(b"key"), Ok(Some(Bytes::from("value"))));
        assert_eq!(
            engine.get(b"key"),
            Some(StoredValue::String(Bytes::from("value")))
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(b"nonexistent"), None);
        assert_eq!(engine.get_string(b"nonexistent"), Ok(None));
    }

    #[test]
    fn test_put_replaces_type_and_expiry() {
        let engine = StorageEngine::new();

        engine.rpush(Bytes::from("key"), list(&["a"])).unwrap();
        engine.set_string(Bytes::from("key"), Bytes::from("v"), ttl(60_000));
        assert_eq!(engine.key_type(b"key"), "string");

        // Overwriting without expiry drops the old deadline
        engine.set_string(Bytes::from("key"), Bytes::from("w"), Expiry::Never);
        let entry = engine.get_shard(b"key").read().get(&b"key"[..]).cloned();
        assert_eq!(entry, Some(Entry::string("w")));
    }

    #[test]
    fn test_remove() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("value"), Expiry::Never);
        assert!(engine.remove(b"key"));
        assert_eq!(engine.get(b"key"), None);
        assert!(!engine.remove(b"key")); // Already deleted
    }

    #[test]
    fn test_lazy_expiry() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("value"), ttl(50));
        assert!(engine.exists(b"key"));

        std::thread::sleep(Duration::from_millis(100));

        // Still stored until something touches it
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get_string(b"key"), Ok(None));
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.get_string(b"key"), Ok(None));
        assert_eq!(engine.stats().evictions, 1);
    }

    #[test]
    fn test_zero_ttl_is_never_visible() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("value"), ttl(0));
        assert_eq!(engine.get_string(b"key"), Ok(None));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_concurrent_zero_ttl_writes_are_never_visible() {
        let engine = Arc::new(StorageEngine::new());
        let key = Bytes::from("key");

        let writer = {
            let engine = Arc::clone(&engine);
            let key = key.clone();
            std::thread::spawn(move || {
                for _ in 0..20_000 {
                    engine.set_string(key.clone(), Bytes::from("v"), ttl(0));
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..20_000 {
                        assert_eq!(engine.get_string(b"key"), Ok(None));
                        assert!(!engine.remove(b"key"));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(engine.get_string(&key), Ok(None));
    }

    #[test]
    fn test_remove_expired_is_not_a_hit() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("value"), ttl(0));
        assert!(!engine.remove(b"key"));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_rpush_and_lrange() {
        let engine = StorageEngine::new();
        let key = Bytes::from("list");

        assert_eq!(engine.rpush(key.clone(), list(&["a", "b", "c"])), Ok(3));
        assert_eq!(engine.rpush(key.clone(), list(&["d"])), Ok(4));
        assert_eq!(engine.lrange(b"list", 0, 3), Ok(list(&["a", "b", "c", "d"])));
        assert_eq!(engine.lrange(b"list", 1, 2), Ok(list(&["b", "c"])));
        assert_eq!(engine.llen(b"list"), Ok(4));
    }

    #[test]
    fn test_lpush_order() {
        let engine = StorageEngine::new();

        assert_eq!(engine.lpush(Bytes::from("list"), list(&["a", "b", "c"])), Ok(3));
        assert_eq!(engine.lrange(b"list", 0, -1), Ok(list(&["c", "b", "a"])));
    }

    #[test]
    fn test_push_empty_does_not_create_key() {
        let engine = StorageEngine::new();

        assert_eq!(engine.rpush(Bytes::from("list"), Vec::new()), Ok(0));
        assert!(!engine.exists(b"list"));
    }

    #[test]
    fn test_list_ops_on_missing_key() {
        let engine = StorageEngine::new();

        assert_eq!(engine.lrange(b"missing", 0, 10), Ok(vec![]));
        assert_eq!(engine.llen(b"missing"), Ok(0));
        assert_eq!(engine.key_type(b"missing"), "none");
    }

    #[test]
    fn test_wrong_type() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("s"), Bytes::from("v"), Expiry::Never);
        assert_eq!(
            engine.rpush(Bytes::from("s"), list(&["x"])),
            Err(StorageError::WrongType)
        );
        assert_eq!(engine.lrange(b"s", 0, 1), Err(StorageError::WrongType));
        assert_eq!(engine.llen(b"s"), Err(StorageError::WrongType));
        // The string is untouched
        assert_eq!(engine.get_string(b"s"), Ok(Some(Bytes::from("v"))));

        engine.rpush(Bytes::from("l"), list(&["x"])).unwrap();
        assert_eq!(engine.get_string(b"l"), Err(StorageError::WrongType));
    }

    #[test]
    fn test_push_onto_expired_string_creates_list() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("key"), Bytes::from("v"), ttl(0));
        assert_eq!(engine.rpush(Bytes::from("key"), list(&["a"])), Ok(1));
        assert_eq!(engine.key_type(b"key"), "list");
    }

    #[test]
    fn test_resolve_range() {
        // start >= len or start > stop
        assert_eq!(resolve_range(3, 3, 5), None);
        assert_eq!(resolve_range(3, 2, 1), None);
        assert_eq!(resolve_range(0, 0, 0), None);
        // stop clamped
        assert_eq!(resolve_range(3, 1, 100), Some(1..3));
        assert_eq!(resolve_range(3, 0, 0), Some(0..1));
        // negative indices count from the tail
        assert_eq!(resolve_range(5, 0, -1), Some(0..5));
        assert_eq!(resolve_range(5, -2, -1), Some(3..5));
        assert_eq!(resolve_range(5, -100, 1), Some(0..2));
        assert_eq!(resolve_range(5, 0, -100), None);
        assert_eq!(resolve_range(5, i64::MIN, i64::MAX), Some(0..5));
    }

    #[test]
    fn test_concurrent_rpush_same_key() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let value = Bytes::from(format!("{}:{}", t, i));
                        engine.rpush(Bytes::from("shared"), vec![value]).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.llen(b"shared"), Ok(8 * 500));
    }

    #[test]
    fn test_concurrent_distinct_keys() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let key = Bytes::from(format!("key:{}:{}", t, i));
                        engine.set_string(key.clone(), Bytes::from("v"), Expiry::Never);
                        assert!(engine.exists(&key));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 4000);
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set_string(Bytes::from("a"), Bytes::from("1"), Expiry::Never);
        engine.get_string(b"a").unwrap();
        engine.remove(b"a");

        let stats = engine.stats();
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.removals, 1);
    }
}
