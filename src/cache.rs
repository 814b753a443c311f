//! Fingerprint-keyed assessment cache with single-flight semantics.
//!
//! [`FingerprintCache`] memoizes [`AssessmentResult`]s by dataset
//! fingerprint. Concurrent callers with the same fingerprint block on
//! the first caller's in-flight computation and receive its result;
//! distinct fingerprints compute fully in parallel. The map guard is
//! held only for slot bookkeeping, never across a computation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock},
    time::{Duration, Instant},
};

use sha2::{Digest, Sha256};

use crate::{
    assess::AssessmentResult,
    dataset::{ArrowDataset, Dataset},
    error::{Error, Result},
    standard::Standard,
};

/// Rows sampled per column for the content checksum.
const FINGERPRINT_SAMPLE_ROWS: usize = 64;

/// Stable identity of a `(dataset, standard)` pair.
///
/// Derived from the row count, the ordered column names, a checksum over
/// a bounded sample of cell values, and the standard's name and version.
/// Sampling keeps fingerprinting cheap on large datasets; datasets that
/// differ only outside the sample share a fingerprint by design.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a dataset under a standard.
    pub fn compute(dataset: &ArrowDataset, standard: &Standard) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(dataset.len().to_le_bytes());

        let sample = dataset.sample_cells(FINGERPRINT_SAMPLE_ROWS);
        for (name, values) in sample.iter() {
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            for value in values {
                match value {
                    Some(v) => hasher.update(v.as_bytes()),
                    None => hasher.update(b"\x00null"),
                }
                hasher.update([0x1e]);
            }
        }

        hasher.update(standard.name().as_bytes());
        hasher.update([0x1f]);
        hasher.update(standard.version().as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    /// Hex digest of the fingerprint.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Published outcome of a slot's computation. Errors are stringified so
/// the slot stays cloneable; the at-most-once guarantee covers failures
/// too.
type Published = Arc<OnceLock<std::result::Result<AssessmentResult, String>>>;

struct Slot {
    published: Published,
    inserted_at: Instant,
    last_used: u64,
}

struct CacheState {
    slots: HashMap<String, Slot>,
    clock: u64,
}

/// Bounded, fingerprint-keyed cache of assessment results.
///
/// Eviction is least-recently-used once the capacity is reached; an
/// optional TTL expires entries on access. Evicting an entry never
/// blocks readers of other entries, and waiters on an evicted in-flight
/// entry keep their own handle to its computation.
///
/// # Example
///
/// ```
/// use depurar::{ArrowDataset, AssessmentEngine, Fingerprint, FingerprintCache, Standard};
///
/// let cache = FingerprintCache::new(128);
/// let dataset = ArrowDataset::from_csv_str("id\n1\n2\n").unwrap();
/// let standard = Standard::new("ids", "1.0", 50.0);
/// let engine = AssessmentEngine::new();
///
/// let fingerprint = Fingerprint::compute(&dataset, &standard);
/// let result = cache
///     .get_or_compute(&fingerprint, || engine.assess(&dataset, &standard))
///     .unwrap();
/// assert!(result.passed);
/// ```
pub struct FingerprintCache {
    capacity: usize,
    ttl: Option<Duration>,
    state: Mutex<CacheState>,
}

impl FingerprintCache {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: None,
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Sets a time-to-live after which entries expire.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.slots.len()).unwrap_or(0)
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.slots.clear();
        }
    }

    /// Whether a non-expired entry exists for the fingerprint.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        state
            .slots
            .get(fingerprint.as_hex())
            .map(|slot| !self.expired(slot))
            .unwrap_or(false)
    }

    /// Returns the cached result for the fingerprint, computing it at
    /// most once.
    ///
    /// The first caller for a fingerprint runs `compute`; concurrent
    /// callers with the same fingerprint block until that computation
    /// publishes and then share its result.
    ///
    /// # Errors
    ///
    /// Returns the computation's error. A failed computation is cached
    /// for the lifetime of its entry and replayed as [`Error::Data`].
    pub fn get_or_compute<F>(&self, fingerprint: &Fingerprint, compute: F) -> Result<AssessmentResult>
    where
        F: FnOnce() -> Result<AssessmentResult>,
    {
        let published = self.slot_for(fingerprint)?;

        let outcome = published.get_or_init(|| compute().map_err(|e| e.to_string()));

        match outcome {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(Error::data(format!("assessment failed: {}", message))),
        }
    }

    /// Fetches or creates the slot for a fingerprint, applying TTL
    /// expiry and LRU eviction. The map guard is released before any
    /// computation starts.
    fn slot_for(&self, fingerprint: &Fingerprint) -> Result<Published> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::data("fingerprint cache lock poisoned"))?;

        state.clock += 1;
        let now = state.clock;
        let key = fingerprint.as_hex();

        if let Some(slot) = state.slots.get_mut(key) {
            let expired = self
                .ttl
                .map(|ttl| slot.inserted_at.elapsed() > ttl)
                .unwrap_or(false);
            if !expired {
                slot.last_used = now;
                return Ok(Arc::clone(&slot.published));
            }
            state.slots.remove(key);
        }

        if state.slots.len() >= self.capacity {
            if let Some(lru_key) = state
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(k, _)| k.clone())
            {
                state.slots.remove(&lru_key);
            }
        }

        let published: Published = Arc::new(OnceLock::new());
        state.slots.insert(
            key.to_string(),
            Slot {
                published: Arc::clone(&published),
                inserted_at: Instant::now(),
                last_used: now,
            },
        );

        Ok(published)
    }

    fn expired(&self, slot: &Slot) -> bool {
        self.ttl
            .map(|ttl| slot.inserted_at.elapsed() > ttl)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for FingerprintCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::assess::AssessmentEngine;

    fn dataset(csv: &str) -> ArrowDataset {
        ArrowDataset::from_csv_str(csv).unwrap()
    }

    fn assess(data: &ArrowDataset, standard: &Standard) -> Result<AssessmentResult> {
        AssessmentEngine::new().assess(data, standard)
    }

    #[test]
    fn test_fingerprint_stable() {
        let data = dataset("id\n1\n2\n");
        let standard = Standard::new("ids", "1.0", 50.0);

        let a = Fingerprint::compute(&data, &standard);
        let b = Fingerprint::compute(&data, &standard);
        assert_eq!(a, b);
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn test_fingerprint_varies_with_content() {
        let standard = Standard::new("ids", "1.0", 50.0);
        let a = Fingerprint::compute(&dataset("id\n1\n2\n"), &standard);
        let b = Fingerprint::compute(&dataset("id\n1\n3\n"), &standard);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_with_standard_version() {
        let data = dataset("id\n1\n2\n");
        let a = Fingerprint::compute(&data, &Standard::new("ids", "1.0", 50.0));
        let b = Fingerprint::compute(&data, &Standard::new("ids", "2.0", 50.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_with_column_names() {
        let standard = Standard::new("ids", "1.0", 50.0);
        let a = Fingerprint::compute(&dataset("id\n1\n"), &standard);
        let b = Fingerprint::compute(&dataset("key\n1\n"), &standard);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_computes_once() {
        let cache = FingerprintCache::new(8);
        let data = dataset("id\n1\n2\n");
        let standard = Standard::new("ids", "1.0", 50.0);
        let fingerprint = Fingerprint::compute(&data, &standard);

        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let result = cache
                .get_or_compute(&fingerprint, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assess(&data, &standard)
                })
                .unwrap();
            assert!(result.passed);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&fingerprint));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_distinct_fingerprints() {
        let cache = FingerprintCache::new(8);
        let standard = Standard::new("ids", "1.0", 50.0);
        let a = dataset("id\n1\n");
        let b = dataset("id\n2\n");

        let calls = AtomicUsize::new(0);
        for data in [&a, &b] {
            let fp = Fingerprint::compute(data, &standard);
            cache
                .get_or_compute(&fp, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assess(data, &standard)
                })
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = FingerprintCache::new(2);
        let standard = Standard::new("ids", "1.0", 50.0);
        let datasets: Vec<ArrowDataset> = (0..3)
            .map(|i| dataset(&format!("id\n{}\n", i)))
            .collect();
        let fingerprints: Vec<Fingerprint> = datasets
            .iter()
            .map(|d| Fingerprint::compute(d, &standard))
            .collect();

        // Fill both slots, touch the first so the second is LRU.
        for i in [0, 1, 0] {
            cache
                .get_or_compute(&fingerprints[i], || assess(&datasets[i], &standard))
                .unwrap();
        }

        // Inserting a third evicts fingerprint 1.
        cache
            .get_or_compute(&fingerprints[2], || assess(&datasets[2], &standard))
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&fingerprints[0]));
        assert!(!cache.contains(&fingerprints[1]));
        assert!(cache.contains(&fingerprints[2]));
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let cache = FingerprintCache::new(8).with_ttl(Duration::from_millis(0));
        let data = dataset("id\n1\n");
        let standard = Standard::new("ids", "1.0", 50.0);
        let fingerprint = Fingerprint::compute(&data, &standard);

        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            std::thread::sleep(Duration::from_millis(2));
            cache
                .get_or_compute(&fingerprint, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assess(&data, &standard)
                })
                .unwrap();
        }

        // The zero TTL expires the entry between calls.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_replays_failures() {
        let cache = FingerprintCache::new(8);
        let data = dataset("id\n1\n");
        let standard = Standard::new("ids", "1.0", 50.0);
        let fingerprint = Fingerprint::compute(&data, &standard);

        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let result = cache.get_or_compute(&fingerprint, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::data("boom"))
            });
            assert!(result.is_err());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_clear() {
        let cache = FingerprintCache::new(8);
        let data = dataset("id\n1\n");
        let standard = Standard::new("ids", "1.0", 50.0);
        let fingerprint = Fingerprint::compute(&data, &standard);

        cache
            .get_or_compute(&fingerprint, || assess(&data, &standard))
            .unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_single_flight_across_threads() {
        use std::sync::Arc as StdArc;

        let cache = StdArc::new(FingerprintCache::new(8));
        let data = StdArc::new(dataset("id\n1\n2\n3\n"));
        let standard = StdArc::new(Standard::new("ids", "1.0", 50.0));
        let fingerprint = StdArc::new(Fingerprint::compute(&data, &standard));
        let calls = StdArc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = StdArc::clone(&cache);
                let data = StdArc::clone(&data);
                let standard = StdArc::clone(&standard);
                let fingerprint = StdArc::clone(&fingerprint);
                let calls = StdArc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_compute(&fingerprint, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            // Widen the race window so contention is real.
                            std::thread::sleep(Duration::from_millis(20));
                            AssessmentEngine::new().assess(&data, &standard)
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<AssessmentResult> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in &results[1..] {
            assert_eq!(result.overall_score, results[0].overall_score);
        }
    }
}
