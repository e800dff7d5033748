//! Concurrent LRU Object Cache
//!
//! This module implements the response cache shared by every worker.
//! Entries are complete response bodies keyed by absolute URI, bounded by a
//! per-object cap, a global byte budget, and an entry-count ceiling.
//!
//! ## Design Decisions
//!
//! 1. **Arena + Indices**: Entries live in a `Vec` of slots and link to each
//!    other by slot index. Promotion and eviction relink indices; nothing
//!    holds a pointer into the list.
//! 2. **One RwLock**: A single lock guards the list, the key index and the
//!    byte count, so every structural mutation is totally ordered.
//! 3. **Two-Step Lookup**: Misses are answered under the read lock. Hits
//!    re-resolve the key under the write lock to promote it, and an entry
//!    that vanished in between is reported as a miss.
//!
//! ## Recency Order
//!
//! ```text
//!   head (MRU)                                   tail (LRU)
//!  ┌─────────┐  next  ┌─────────┐  next  ┌─────────┐
//!  │ slot 3  │ ─────> │ slot 0  │ ─────> │ slot 5  │ ──> evicted first
//!  │ uri, 2K │ <───── │ uri, 9K │ <───── │ uri, 1K │
//!  └─────────┘  prev  └─────────┘  prev  └─────────┘
//! ```
//!
//! ## Lock Poisoning
//!
//! A poisoned lock means a writer panicked halfway through relinking. The
//! list may be torn, so every accessor panics instead of recovering.

use crate::cache::config::CacheConfig;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

/// A cached response body and the URI it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cache key (absolute URI)
    pub uri: String,
    /// Response body bytes
    pub content: Bytes,
}

impl CacheEntry {
    /// Size charged against the cache budget.
    #[inline]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Result of a [`Cache::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry is now at the head of the cache
    Stored {
        /// Entries evicted from the tail to make room
        evicted: usize,
        /// Whether an older entry for the same URI was replaced
        replaced: bool,
    },
    /// The object exceeds the per-object cap and was not cached
    TooLarge { size: usize },
}

impl InsertOutcome {
    /// Returns true if the entry was cached.
    pub fn is_stored(&self) -> bool {
        matches!(self, InsertOutcome::Stored { .. })
    }
}

/// A slot in the arena.
#[derive(Debug)]
struct Node {
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// The recency list and its bookkeeping; always accessed under the lock.
#[derive(Debug, Default)]
struct LruList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    total_size: usize,
}

impl LruList {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, idx: usize) -> &Node {
        self.slots[idx].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.slots[idx].as_mut().expect("linked slot is occupied")
    }

    /// Unlinks a node, leaving it in its slot with no neighbours.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    /// Links a detached node at the head.
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }

        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn promote(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.detach(idx);
            self.attach_front(idx);
        }
    }

    fn push_front(&mut self, entry: CacheEntry) {
        let size = entry.size();
        let uri = entry.uri.clone();
        let node = Node {
            entry,
            prev: None,
            next: None,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        self.index.insert(uri, idx);
        self.attach_front(idx);
        self.total_size += size;
    }

    fn remove(&mut self, idx: usize) -> CacheEntry {
        self.detach(idx);
        let node = self.slots[idx].take().expect("linked slot is occupied");
        self.free.push(idx);
        self.index.remove(&node.entry.uri);
        self.total_size -= node.entry.size();
        node.entry
    }

    fn pop_tail(&mut self) -> Option<CacheEntry> {
        let tail = self.tail?;
        Some(self.remove(tail))
    }

    fn clear(&mut self) {
        *self = LruList::default();
    }
}

/// The shared response cache.
///
/// Wrap it in an `Arc` and hand a clone to every worker. All operations
/// take `&self`.
///
/// # Example
///
/// ```
/// use proxycache::cache::{Cache, CacheConfig};
/// use bytes::Bytes;
///
/// let cache = Cache::with_config(CacheConfig {
///     max_object_size: 16,
///     max_cache_size: 32,
///     max_entries: 8,
/// });
///
/// cache.insert("http://x/a", Bytes::from("0123456789abcdef"));
/// cache.insert("http://x/b", Bytes::from("0123456789abcdef"));
/// cache.lookup("http://x/a"); // a is now most recently used
/// cache.insert("http://x/c", Bytes::from("0123456789abcdef"));
///
/// assert!(cache.contains("http://x/a"));
/// assert!(!cache.contains("http://x/b"));
/// ```
pub struct Cache {
    list: RwLock<LruList>,
    config: CacheConfig,

    /// Statistics: lookups that returned content
    hits: AtomicU64,

    /// Statistics: lookups that found nothing
    misses: AtomicU64,

    /// Statistics: successful insertions
    insertions: AtomicU64,

    /// Statistics: entries evicted from the tail
    evictions: AtomicU64,

    /// Statistics: insertions refused for exceeding the object cap
    rejected: AtomicU64,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .field("evictions", &self.evictions.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Creates an empty cache with default limits.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates an empty cache with the given limits.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            list: RwLock::new(LruList::default()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LruList> {
        self.list.read().expect("cache lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, LruList> {
        self.list.write().expect("cache lock poisoned")
    }

    /// Returns the limits this cache enforces.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up a body by URI, promoting it to most recently used on a hit.
    ///
    /// The returned `Bytes` shares the cached buffer; no copy is made.
    pub fn lookup(&self, uri: &str) -> Option<Bytes> {
        if !self.read().index.contains_key(uri) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.promote(uri)
    }

    /// Second step of [`Cache::lookup`]: re-resolves `uri` under the write
    /// lock and promotes it, or counts a miss if it is gone.
    fn promote(&self, uri: &str) -> Option<Bytes> {
        let mut list = self.write();
        match list.index.get(uri).copied() {
            Some(idx) => {
                list.promote(idx);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(list.node(idx).entry.content.clone())
            }
            None => {
                // Evicted between the read pass and promotion
                trace!(uri = uri, "Entry vanished before promotion");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts a body, evicting from the tail until it fits.
    ///
    /// Bodies larger than the per-object cap are skipped. An existing entry
    /// for the same URI is replaced and its size credited back first.
    pub fn insert(&self, uri: impl Into<String>, content: Bytes) -> InsertOutcome {
        let size = content.len();
        if size > self.config.max_object_size || size > self.config.max_cache_size {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return InsertOutcome::TooLarge { size };
        }

        let uri = uri.into();
        let mut list = self.write();

        let replaced = match list.index.get(&uri).copied() {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        };

        let mut evicted = 0;
        while list.total_size + size > self.config.max_cache_size
            || list.len() >= self.config.max_entries
        {
            match list.pop_tail() {
                Some(victim) => {
                    trace!(uri = %victim.uri, size = victim.size(), "Evicted entry");
                    evicted += 1;
                }
                None => break,
            }
        }

        list.push_front(CacheEntry { uri, content });
        drop(list);

        self.insertions.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);

        InsertOutcome::Stored { evicted, replaced }
    }

    /// Removes and returns the least recently used entry.
    ///
    /// Returns `None` and changes nothing if the cache is empty.
    pub fn evict_tail(&self) -> Option<CacheEntry> {
        let victim = self.write().pop_tail();
        if victim.is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        victim
    }

    /// Returns true if an entry exists for `uri`, without promoting it.
    pub fn contains(&self, uri: &str) -> bool {
        self.read().index.contains_key(uri)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the sizes of all cached entries, in bytes.
    pub fn total_size(&self) -> usize {
        self.read().total_size
    }

    /// Global byte budget.
    pub fn capacity(&self) -> usize {
        self.config.max_cache_size
    }

    /// Cached URIs from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        let list = self.read();
        let mut keys = Vec::with_capacity(list.len());
        let mut cursor = list.head;
        while let Some(idx) = cursor {
            let node = list.node(idx);
            keys.push(node.entry.uri.clone());
            cursor = node.next;
        }
        keys
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (entries, total_size) = {
            let list = self.read();
            (list.len(), list.total_size)
        };

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            entries,
            total_size,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned content
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Successful insertions
    pub insertions: u64,
    /// Entries evicted from the tail
    pub evictions: u64,
    /// Insertions refused for size
    pub rejected: u64,
    /// Entries currently cached
    pub entries: usize,
    /// Bytes currently cached
    pub total_size: usize,
}
