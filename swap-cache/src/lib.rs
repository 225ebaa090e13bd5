//! The Price Index (D): a bounded-memory LRU cache mapping token mint to the
//! latest validated [`Observation`], enforcing a byte-footprint ceiling
//! rather than a fixed entry count.
//!
//! Built on [`lru::LruCache`] for the O(1) hashmap-plus-intrusive-list
//! structure the specification's design notes call for (§9); the byte
//! footprint accounting and the evict-to-0.7-of-ceiling cleanup policy are
//! layered on top since the `lru` crate only knows about entry counts.

mod clock;

pub use clock::{Clock, SystemClock};

use lru::LruCache;
use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use swap_instrument::{Observation, ObservationError};
use thiserror::Error;
use tracing::{debug, warn};

/// Default fraction of the ceiling at which cleanup is triggered (§4.4).
pub const DEFAULT_CLEANUP_THRESHOLD: f64 = 0.85;

/// Default fraction of the ceiling cleanup evicts down to (§4.4).
pub const DEFAULT_CLEANUP_TARGET: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("observation fails structural validation: {0}")]
    InvalidObservation(#[from] ObservationError),

    #[error("programId {0} is not in the builder registry whitelist")]
    ProgramNotWhitelisted(Pubkey),
}

/// Usage snapshot returned by [`PriceIndex::stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub usage_bytes: usize,
    pub ceiling_bytes: usize,
    pub usage_pct: f64,
    pub oldest_stored_at_ms: Option<i64>,
    pub newest_stored_at_ms: Option<i64>,
}

struct Inner {
    cache: LruCache<Pubkey, Observation>,
}

/// Bounded LRU price index. Cheaply cloneable — internally `Arc`-shared, so
/// the ingestion task and the request-handler tasks hold independent
/// handles to the same underlying map (§5).
#[derive(Clone)]
pub struct PriceIndex {
    inner: Arc<RwLock<Inner>>,
    ceiling_bytes: usize,
    cleanup_threshold: f64,
    cleanup_target: f64,
    whitelist: Arc<HashSet<Pubkey>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PriceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceIndex")
            .field("ceiling_bytes", &self.ceiling_bytes)
            .field("cleanup_threshold", &self.cleanup_threshold)
            .field("cleanup_target", &self.cleanup_target)
            .finish()
    }
}

impl PriceIndex {
    /// Construct a new index. `whitelist` should be the builder registry's
    /// `supportedProgramIds()` set (§4.5) — the index rejects any
    /// observation whose `program_id` is not in it.
    pub fn new(ceiling_bytes: usize, whitelist: HashSet<Pubkey>) -> Self {
        Self::with_clock(ceiling_bytes, whitelist, Arc::new(SystemClock))
    }

    pub fn with_clock(ceiling_bytes: usize, whitelist: HashSet<Pubkey>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                cache: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
            })),
            ceiling_bytes,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
            cleanup_target: DEFAULT_CLEANUP_TARGET,
            whitelist: Arc::new(whitelist),
            clock,
        }
    }

    pub fn with_cleanup_policy(mut self, threshold: f64, target: f64) -> Self {
        self.cleanup_threshold = threshold;
        self.cleanup_target = target;
        self
    }

    fn footprint_bytes(entries: usize) -> usize {
        entries * Observation::ESTIMATED_FOOTPRINT_BYTES
    }

    /// Insert or overwrite an observation, promoting it to
    /// most-recently-used, then evict from the least-recently-used end
    /// until the footprint falls to `ceiling * cleanup_target` if it
    /// exceeded `ceiling * cleanup_threshold` (§4.4).
    pub fn put(&self, observation: Observation) -> Result<(), CacheError> {
        observation.validate_structure()?;
        if !self.whitelist.contains(&observation.program_id) {
            return Err(CacheError::ProgramNotWhitelisted(observation.program_id));
        }

        let mint = observation.mint;
        let mut guard = self.inner.write();
        guard.cache.put(mint, observation);

        let cleanup_trigger = (self.ceiling_bytes as f64 * self.cleanup_threshold) as usize;
        let cleanup_target_bytes = (self.ceiling_bytes as f64 * self.cleanup_target) as usize;

        if Self::footprint_bytes(guard.cache.len()) > cleanup_trigger {
            let mut evicted = 0usize;
            while Self::footprint_bytes(guard.cache.len()) > cleanup_target_bytes {
                match guard.cache.pop_lru() {
                    Some((evicted_mint, _)) => {
                        evicted += 1;
                        debug!(%evicted_mint, "evicted least-recently-used price observation");
                    }
                    None => break,
                }
            }
            if evicted > 0 {
                warn!(evicted, entries = guard.cache.len(), "price index cleanup ran");
            }
        }

        Ok(())
    }

    /// Return the current observation for `mint`, promoting it to
    /// most-recently-used and refreshing `last_access_ms`.
    pub fn get(&self, mint: &Pubkey) -> Option<Observation> {
        let mut guard = self.inner.write();
        let now = self.clock.now_ms();
        let observation = guard.cache.get_mut(mint)?;
        observation.last_access_ms = now;
        Some(observation.clone())
    }

    /// Snapshot of every entry; does not change access order.
    pub fn get_all(&self) -> Vec<Observation> {
        let guard = self.inner.read();
        guard.cache.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn remove(&self, mint: &Pubkey) -> Option<Observation> {
        self.inner.write().cache.pop(mint)
    }

    pub fn clear(&self) {
        self.inner.write().cache.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.read();
        let entries = guard.cache.len();
        let usage_bytes = Self::footprint_bytes(entries);
        let mut oldest = None;
        let mut newest = None;
        for (_, obs) in guard.cache.iter() {
            oldest = Some(oldest.map_or(obs.stored_at_ms, |o: i64| o.min(obs.stored_at_ms)));
            newest = Some(newest.map_or(obs.stored_at_ms, |n: i64| n.max(obs.stored_at_ms)));
        }

        CacheStats {
            entries,
            usage_bytes,
            ceiling_bytes: self.ceiling_bytes,
            usage_pct: if self.ceiling_bytes == 0 {
                0.0
            } else {
                usage_bytes as f64 / self.ceiling_bytes as f64
            },
            oldest_stored_at_ms: oldest,
            newest_stored_at_ms: newest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(mint: Pubkey, program_id: Pubkey, price: f64) -> Observation {
        Observation {
            mint,
            pool: Pubkey::new_unique(),
            avg_price: price,
            program_id,
            slot: "1".into(),
            stored_at_ms: 0,
            last_access_ms: 0,
        }
    }

    fn index_with(program_id: Pubkey, ceiling_bytes: usize) -> PriceIndex {
        let mut whitelist = HashSet::new();
        whitelist.insert(program_id);
        PriceIndex::new(ceiling_bytes, whitelist)
    }

    #[test]
    fn put_then_get_roundtrips() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);

        index.put(observation(mint, program, 2000.0)).unwrap();
        let got = index.get(&mint).unwrap();
        assert_eq!(got.avg_price, 2000.0);
    }

    #[test]
    fn rejects_non_whitelisted_program() {
        let program = Pubkey::new_unique();
        let other_program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);

        let err = index.put(observation(mint, other_program, 10.0)).unwrap_err();
        assert_eq!(err, CacheError::ProgramNotWhitelisted(other_program));
    }

    #[test]
    fn rejects_invalid_structure() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);

        let err = index.put(observation(mint, program, -1.0)).unwrap_err();
        assert!(matches!(err, CacheError::InvalidObservation(_)));
    }

    #[test]
    fn last_write_wins_for_same_mint() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);

        index.put(observation(mint, program, 2000.0)).unwrap();
        index.put(observation(mint, program, 2500.0)).unwrap();

        assert_eq!(index.get(&mint).unwrap().avg_price, 2500.0);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let program = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);
        assert!(index.get(&Pubkey::new_unique()).is_none());
    }

    #[test]
    fn evicts_lru_entry_when_ceiling_exceeded() {
        let program = Pubkey::new_unique();
        // Ceiling sized for exactly 10 entries at 474 bytes/entry.
        let ceiling = Observation::ESTIMATED_FOOTPRINT_BYTES * 10;
        let index = index_with(program, ceiling);

        let mut mints = Vec::new();
        for _ in 0..10 {
            let mint = Pubkey::new_unique();
            index.put(observation(mint, program, 1.0)).unwrap();
            mints.push(mint);
        }

        // Touch all but the first to keep it least-recently-used.
        for mint in &mints[1..] {
            index.get(mint);
        }

        // Push past the cleanup trigger (85% of ceiling = ~8.5 entries, so
        // the 11th insertion forces cleanup down to 70% = 7 entries).
        let overflow_mint = Pubkey::new_unique();
        index.put(observation(overflow_mint, program, 1.0)).unwrap();

        assert!(index.get(&mints[0]).is_none(), "LRU entry should have been evicted");
        let target_entries = (ceiling as f64 * DEFAULT_CLEANUP_TARGET
            / Observation::ESTIMATED_FOOTPRINT_BYTES as f64) as usize;
        assert!(index.len() <= target_entries.max(1) + 1);
    }

    #[test]
    fn get_all_does_not_reorder() {
        let program = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        index.put(observation(a, program, 1.0)).unwrap();
        index.put(observation(b, program, 2.0)).unwrap();

        let before = index.get_all();
        let after = index.get_all();
        assert_eq!(before.len(), after.len());
        assert_eq!(before.iter().map(|o| o.mint).collect::<Vec<_>>(), after.iter().map(|o| o.mint).collect::<Vec<_>>());
    }

    #[test]
    fn stats_reports_usage_percentage() {
        let program = Pubkey::new_unique();
        let ceiling = Observation::ESTIMATED_FOOTPRINT_BYTES * 4;
        let index = index_with(program, ceiling);
        index.put(observation(Pubkey::new_unique(), program, 1.0)).unwrap();

        let stats = index.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.ceiling_bytes, ceiling);
        assert!((stats.usage_pct - 0.25).abs() < 1e-9);
    }

    #[test]
    fn clear_empties_the_index() {
        let program = Pubkey::new_unique();
        let index = index_with(program, 1_000_000);
        index.put(observation(Pubkey::new_unique(), program, 1.0)).unwrap();
        index.clear();
        assert!(index.is_empty());
    }
}
