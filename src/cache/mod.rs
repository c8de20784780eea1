//! Concurrency-safe, memory-bounded document cache.
//!
//! The cache owns the map of storage key → [`Document`] plus a parallel
//! key → category index, guarded by a single reader/writer lock. On top of
//! the store it layers hit/miss/invalidation accounting, a deterministic
//! approximate memory estimator and a background cleanup thread that evicts
//! entries once the estimate crosses the configured budget.
//!
//! # Thread Safety
//!
//! All read operations take the shared lock and proceed concurrently; all
//! mutating operations take the exclusive lock. The hit/miss/invalidation
//! counters are atomics so lookups stay on the shared path without losing
//! updates. No I/O happens inside locked sections.
//!
//! # Eviction
//!
//! Eviction is deliberately not recency-based: it removes roughly 10% of
//! current entries in map iteration order, which is unspecified. Consumers
//! may only rely on the store getting approximately 10% smaller per pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::ArchdocConfig;
use crate::models::{Document, DocumentIndex};
use crate::{Error, Result};

/// Fixed per-document metadata overhead used by the memory estimator.
const DOC_METADATA_OVERHEAD: usize = 200;
/// Fixed per-document content overhead used by the memory estimator.
const DOC_CONTENT_OVERHEAD: usize = 100;
/// Per-entry map overhead used by the memory estimator.
const MAP_ENTRY_OVERHEAD: usize = 50;
/// Per-entry category index overhead used by the memory estimator.
const INDEX_ENTRY_OVERHEAD: usize = 100;

/// Process-wide cache counters.
///
/// `hits`, `misses` and `invalidations` increase monotonically;
/// `memory_usage` is a recomputed estimate, not a counter. Reset only by
/// [`DocumentCache::clear`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Successful lookups.
    pub hits: u64,
    /// Failed lookups.
    pub misses: u64,
    /// Entries removed by invalidation or eviction (plus no-op single-key
    /// invalidations, see [`DocumentCache::invalidate`]).
    pub invalidations: u64,
    /// When the last cleanup cycle ran.
    pub last_cleanup: DateTime<Utc>,
    /// Estimated memory usage in bytes.
    pub memory_usage: usize,
}

/// Snapshot of cache health for diagnostics surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Number of cached documents.
    pub document_count: usize,
    /// Estimated memory usage in bytes.
    pub memory_usage: usize,
    /// Configured memory budget in bytes.
    pub memory_budget: usize,
    /// Hit ratio as a percentage (0.0 when no lookups occurred).
    pub hit_ratio: f64,
    /// Counter snapshot.
    pub stats: CacheStats,
}

/// Map state guarded by the cache lock.
#[derive(Debug, Default)]
struct CacheState {
    /// Storage key → document.
    documents: HashMap<String, Arc<Document>>,
    /// Category name → rebuilt index.
    indexes: HashMap<String, DocumentIndex>,
    /// Storage key → category name, scanned by category operations.
    key_to_category: HashMap<String, String>,
    /// Estimated memory usage, recomputed after every mutation.
    memory_usage: usize,
    /// When the last cleanup cycle ran.
    last_cleanup: DateTime<Utc>,
}

impl CacheState {
    /// Recomputes the deterministic memory estimate.
    ///
    /// The formula is an approximation of allocator bytes, kept as a fixed
    /// formula so eviction thresholds behave identically everywhere:
    /// per document `200 + content + 100`, plus `50` per map entry and
    /// `100` per category index entry.
    fn recompute_memory_usage(&mut self) {
        let docs: usize = self
            .documents
            .values()
            .map(|d| DOC_METADATA_OVERHEAD + d.raw_content.len() + DOC_CONTENT_OVERHEAD)
            .sum();
        self.memory_usage = docs
            + self.documents.len() * MAP_ENTRY_OVERHEAD
            + self.key_to_category.len() * INDEX_ENTRY_OVERHEAD;
    }

    /// Removes roughly 10% of entries in map iteration order.
    ///
    /// Returns the number of entries removed. Not recency-based.
    fn evict_tenth(&mut self) -> usize {
        let count = self.documents.len();
        let keep = count * 9 / 10;
        let victims: Vec<String> = self.documents.keys().take(count - keep).cloned().collect();

        for key in &victims {
            self.documents.remove(key);
            self.key_to_category.remove(key);
        }
        victims.len()
    }
}

/// The document store and cache controller.
///
/// See the [module documentation](self) for the concurrency and eviction
/// model. Create one per process; it lives until [`DocumentCache::close`]
/// or drop, either of which stops the background cleanup thread (contents
/// stay in place until the cache itself is dropped).
pub struct DocumentCache {
    state: Arc<RwLock<CacheState>>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Shared with the background worker, which counts its evictions too.
    invalidations: Arc<AtomicU64>,
    max_memory_bytes: usize,
    /// Taken exactly once by `close`; dropping the sender disconnects the
    /// background thread's channel and ends its loop.
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DocumentCache {
    /// Creates an empty cache and starts the background cleanup thread.
    #[must_use]
    pub fn new(config: &ArchdocConfig) -> Self {
        let state = Arc::new(RwLock::new(CacheState {
            last_cleanup: Utc::now(),
            ..CacheState::default()
        }));
        let invalidations = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = mpsc::channel();

        let worker = spawn_cleanup_thread(
            Arc::downgrade(&state),
            Arc::clone(&invalidations),
            config.cache.max_memory_bytes,
            config.cache.cleanup_interval,
            stop_rx,
        );

        Self {
            state,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations,
            max_memory_bytes: config.cache.max_memory_bytes,
            stop_tx: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Looks up a document by exact key.
    ///
    /// Returns the shared stored value on a hit; documents are immutable so
    /// the returned `Arc` is safe to alias freely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheMiss`] carrying the key when absent.
    pub fn get(&self, key: &str) -> Result<Arc<Document>> {
        let state = read_lock(&self.state);
        match state.documents.get(key) {
            Some(doc) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("document_cache_lookups_total", "outcome" => "hit").increment(1);
                Ok(Arc::clone(doc))
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("document_cache_lookups_total", "outcome" => "miss").increment(1);
                tracing::debug!(key = %key, "Document cache miss");
                Err(Error::CacheMiss {
                    key: key.to_string(),
                })
            },
        }
    }

    /// Inserts or replaces a document.
    ///
    /// Runs an eviction pass first when the memory estimate exceeds 80% of
    /// the budget. Replacing an existing key does not count as an
    /// invalidation.
    pub fn set(&self, key: impl Into<String>, document: Document) {
        let key = key.into();
        let category = document.metadata.category.as_str().to_string();
        let mut state = write_lock(&self.state);

        if state.memory_usage > self.max_memory_bytes / 100 * 80 {
            let removed = state.evict_tenth();
            self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(
                removed = removed,
                memory_usage = state.memory_usage,
                "Evicted entries before insert"
            );
            metrics::counter!("document_cache_evictions_total").increment(removed as u64);
        }

        state.documents.insert(key.clone(), Arc::new(document));
        state.key_to_category.insert(key, category);
        state.recompute_memory_usage();
        metrics::gauge!("document_cache_memory_bytes").set(state.memory_usage as f64);
        metrics::gauge!("document_cache_documents").set(state.documents.len() as f64);
    }

    /// Deletes a key unconditionally.
    ///
    /// Always increments the invalidation counter, even when the key was
    /// absent; callers must not read the counter as "entries actually
    /// removed" for single-key invalidation.
    pub fn invalidate(&self, key: &str) {
        let mut state = write_lock(&self.state);
        state.documents.remove(key);
        state.key_to_category.remove(key);
        state.recompute_memory_usage();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "Invalidated cache entry");
        metrics::counter!("document_cache_invalidations_total").increment(1);
    }

    /// Deletes every document in a category.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_by_category(&self, category: &str) -> usize {
        let mut state = write_lock(&self.state);
        // Collect first to avoid mutating the map mid-iteration.
        let victims: Vec<String> = state
            .key_to_category
            .iter()
            .filter(|(_, c)| c.as_str() == category)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &victims {
            state.documents.remove(key);
            state.key_to_category.remove(key);
        }
        state.recompute_memory_usage();
        self.invalidations
            .fetch_add(victims.len() as u64, Ordering::Relaxed);
        tracing::debug!(category = %category, removed = victims.len(), "Invalidated category");
        metrics::counter!("document_cache_invalidations_total").increment(victims.len() as u64);
        victims.len()
    }

    /// Deletes the given keys, skipping ones that do not exist.
    ///
    /// Returns the number of entries actually removed; unlike
    /// [`DocumentCache::invalidate`], absent keys do not inflate the
    /// invalidation counter.
    pub fn invalidate_by_paths(&self, paths: &[String]) -> usize {
        let mut state = write_lock(&self.state);
        let mut removed = 0;
        for key in paths {
            if state.documents.remove(key).is_some() {
                state.key_to_category.remove(key);
                removed += 1;
            }
        }
        state.recompute_memory_usage();
        self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
        metrics::counter!("document_cache_invalidations_total").increment(removed as u64);
        removed
    }

    /// Empties the store and resets all statistics.
    pub fn clear(&self) {
        let mut state = write_lock(&self.state);
        state.documents.clear();
        state.indexes.clear();
        state.key_to_category.clear();
        state.recompute_memory_usage();
        state.last_cleanup = Utc::now();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
        tracing::debug!("Cleared document cache");
        metrics::gauge!("document_cache_memory_bytes").set(0.0);
        metrics::gauge!("document_cache_documents").set(0.0);
    }

    /// Returns a fresh map of every cached document.
    ///
    /// The container is new; the documents are the shared stored values.
    #[must_use]
    pub fn get_all_documents(&self) -> HashMap<String, Arc<Document>> {
        let state = read_lock(&self.state);
        state
            .documents
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Returns every document in a category, in unspecified order.
    #[must_use]
    pub fn get_by_category(&self, category: &str) -> Vec<Arc<Document>> {
        let state = read_lock(&self.state);
        state
            .key_to_category
            .iter()
            .filter(|(_, c)| c.as_str() == category)
            .filter_map(|(k, _)| state.documents.get(k).map(Arc::clone))
            .collect()
    }

    /// Returns the rebuilt index for a category, if one was stored.
    #[must_use]
    pub fn get_index(&self, category: &str) -> Option<DocumentIndex> {
        read_lock(&self.state).indexes.get(category).cloned()
    }

    /// Returns a fresh map of every stored category index.
    #[must_use]
    pub fn get_all_indexes(&self) -> HashMap<String, DocumentIndex> {
        read_lock(&self.state).indexes.clone()
    }

    /// Stores a rebuilt index for a category.
    pub fn set_index(&self, category: impl Into<String>, index: DocumentIndex) {
        write_lock(&self.state).indexes.insert(category.into(), index);
    }

    /// Returns the distinct categories currently cached, in unspecified order.
    #[must_use]
    pub fn get_categories(&self) -> Vec<String> {
        let state = read_lock(&self.state);
        let mut categories: Vec<String> = state.key_to_category.values().cloned().collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    /// Returns the number of cached documents.
    #[must_use]
    pub fn size(&self) -> usize {
        read_lock(&self.state).documents.len()
    }

    /// Returns `true` when no documents are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    pub fn get_stats(&self) -> CacheStats {
        let state = read_lock(&self.state);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            last_cleanup: state.last_cleanup,
            memory_usage: state.memory_usage,
        }
    }

    /// Returns the hit ratio as a percentage.
    ///
    /// Defined as `0.0` before any lookup has happened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_cache_hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64 * 100.0
    }

    /// Returns a diagnostics snapshot of counters and capacity.
    #[must_use]
    pub fn get_performance_metrics(&self) -> PerformanceReport {
        let stats = self.get_stats();
        PerformanceReport {
            document_count: self.size(),
            memory_usage: stats.memory_usage,
            memory_budget: self.max_memory_bytes,
            hit_ratio: self.get_cache_hit_ratio(),
            stats,
        }
    }

    /// Explicit cleanup: refreshes the memory estimate and cleanup time.
    ///
    /// There is no collection step; freed documents are reclaimed when
    /// their last `Arc` drops.
    pub fn cleanup(&self) {
        let mut state = write_lock(&self.state);
        state.recompute_memory_usage();
        state.last_cleanup = Utc::now();
        tracing::debug!(memory_usage = state.memory_usage, "Explicit cache cleanup");
    }

    /// Stops the background cleanup thread.
    ///
    /// Idempotent and callable from any thread; cached content stays in
    /// place. Dropping the cache closes it as well.
    pub fn close(&self) {
        let sender = match self.stop_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        // Dropping the sender disconnects the channel; the worker's
        // recv_timeout returns immediately and the loop exits.
        drop(sender);

        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.join();
            tracing::debug!("Document cache background worker stopped");
        }
    }
}

impl Drop for DocumentCache {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("documents", &self.size())
            .field("max_memory_bytes", &self.max_memory_bytes)
            .finish_non_exhaustive()
    }
}

/// Spawns the periodic cleanup thread.
///
/// The thread holds only a weak reference to the cache state so an un-closed
/// cache can still be reclaimed; it exits when the stop channel disconnects
/// or the state is gone.
fn spawn_cleanup_thread(
    state: Weak<RwLock<CacheState>>,
    invalidations: Arc<AtomicU64>,
    max_memory_bytes: usize,
    interval: Duration,
    stop_rx: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let Some(state) = state.upgrade() else {
                        break;
                    };
                    run_cleanup_cycle(&state, &invalidations, max_memory_bytes);
                },
                // Stop signal or sender dropped.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

/// One background cleanup cycle.
///
/// Evicts only when the memory estimate exceeds the full budget (the 80%
/// threshold applies only to the insert path), then refreshes the estimate
/// and the cleanup timestamp.
fn run_cleanup_cycle(
    state: &RwLock<CacheState>,
    invalidations: &AtomicU64,
    max_memory_bytes: usize,
) {
    let over_budget = read_lock(state).memory_usage > max_memory_bytes;
    if !over_budget {
        return;
    }

    let mut guard = write_lock(state);
    // Re-check under the write lock; a clear or invalidation may have run.
    if guard.memory_usage <= max_memory_bytes {
        return;
    }
    let removed = guard.evict_tenth();
    invalidations.fetch_add(removed as u64, Ordering::Relaxed);
    guard.recompute_memory_usage();
    guard.last_cleanup = Utc::now();
    tracing::debug!(
        removed = removed,
        memory_usage = guard.memory_usage,
        "Background cleanup evicted entries"
    );
    metrics::counter!("document_cache_evictions_total").increment(removed as u64);
    metrics::gauge!("document_cache_memory_bytes").set(guard.memory_usage as f64);
}

/// Acquires the shared lock, recovering from poisoning.
///
/// A panic mid-mutation can at worst leave the stats estimate stale; the
/// maps themselves are updated in single statements, so recovering the
/// guard is preferable to propagating poison through every caller.
fn read_lock(state: &RwLock<CacheState>) -> RwLockReadGuard<'_, CacheState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires the exclusive lock, recovering from poisoning.
fn write_lock(state: &RwLock<CacheState>) -> RwLockWriteGuard<'_, CacheState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
