use crate::error::Result;
use crate::storage::{DataSource, Query};
use arrow::record_batch::RecordBatch;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Normalized identity of a query in the cache.
pub type CacheKey = String;

/// Maps a query to its cache key.
pub type KeyFn = fn(&Query) -> CacheKey;

/// Default key: the exact SQL text followed by the bound parameter values.
///
/// Two queries that differ only in whitespace are distinct entries; two
/// queries with the same text and the same bound values share one entry.
pub fn exact_key(query: &Query) -> CacheKey {
    query.to_string()
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, RecordBatch>,
    hit_count: u64,
    miss_count: u64,
}

/// Memoizing decorator over a [`DataSource`].
///
/// The first `fetch` of a key runs the query against the inner source and
/// stores the result; later fetches of the same key return the stored batch.
/// Entries never expire; they live as long as the cache (or until [`clear`]).
/// Failed fetches are not stored.
///
/// The lock is held across a miss so concurrent callers of the same key see a
/// single execution.
///
/// [`clear`]: QueryCache::clear
pub struct QueryCache<S> {
    source: S,
    key_fn: KeyFn,
    state: Mutex<CacheState>,
}

impl<S: DataSource> QueryCache<S> {
    pub fn new(source: S) -> Self {
        Self::with_key_fn(source, exact_key)
    }

    pub fn with_key_fn(source: S, key_fn: KeyFn) -> Self {
        Self {
            source,
            key_fn,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The wrapped data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            hit_count: state.hit_count,
            miss_count: state.miss_count,
        }
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        debug!("Cleared query cache");
    }
}

impl<S: DataSource> DataSource for QueryCache<S> {
    fn fetch(&self, query: &Query) -> Result<RecordBatch> {
        let key = (self.key_fn)(query);
        let mut state = self.state.lock();

        if let Some(batch) = state.entries.get(&key) {
            let batch = batch.clone();
            state.hit_count += 1;
            debug!(key = %key, "Query cache hit");
            return Ok(batch);
        }

        state.miss_count += 1;
        debug!(key = %key, "Query cache miss");
        let batch = self.source.fetch(query)?;
        state.entries.insert(key, batch.clone());
        Ok(batch)
    }
}
