use indexmap::IndexMap;
use ndarray::{Array1, ArrayView1};

/// Default number of curves kept in the cache of each vector
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Which curve is stored in a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CurveKind {
    Rdf { zero_mean: bool },
    Adf,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    kind: CurveKind,
    grid: Vec<u64>,
}

impl CacheKey {
    pub(crate) fn new(kind: CurveKind, grid: ArrayView1<'_, f64>) -> CacheKey {
        let grid = grid.iter()
            .map(|&x| if x == 0.0 { 0.0_f64.to_bits() } else { x.to_bits() })
            .collect();

        CacheKey { kind, grid }
    }
}

/// Least-recently used table of curves already computed for a vector. The
/// order of entries in the map is the usage order, the least recently used
/// entry comes first.
#[derive(Debug)]
pub(crate) struct DistributionCache {
    entries: IndexMap<CacheKey, Array1<f64>>,
    capacity: usize,
}

impl DistributionCache {
    pub(crate) fn new(capacity: usize) -> DistributionCache {
        DistributionCache {
            entries: IndexMap::new(),
            capacity: capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Change the capacity of the cache, evicting the oldest entries if needed
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    /// Get the curve for `key` if it is cached, marking it as the most
    /// recently used entry
    pub(crate) fn get(&mut self, key: &CacheKey) -> Option<Array1<f64>> {
        let value = self.entries.shift_remove(key)?;
        self.entries.insert(key.clone(), value.clone());
        return Some(value);
    }

    pub(crate) fn insert(&mut self, key: CacheKey, value: Array1<f64>) {
        if self.capacity == 0 {
            return;
        }

        self.entries.shift_remove(&key);
        self.entries.insert(key, value);
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some((key, _)) = self.entries.shift_remove_index(0) {
                log::debug!(
                    "evicting cached {:?} curve with {} points", key.kind, key.grid.len()
                );
            }
        }
    }
}
