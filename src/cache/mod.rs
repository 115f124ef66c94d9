use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::log::debug;
use bevy::prelude::Resource;
use lru::LruCache;

use crate::render::{GridShape, QualityTier, SampleGrid};

const DEFAULT_CAPACITY: usize = 12;

#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct GridKey {
    pub shape: GridShape,
    pub tier: QualityTier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridMetrics {
    pub grids_built: u32,
    pub cache_hits: u32,
}

struct Inner {
    grids: LruCache<GridKey, Arc<SampleGrid>>,
    metrics: GridMetrics,
}

/// Sample grids are pure functions of (shape, tier); switching quality tiers
/// back and forth should not rebuild them.
#[derive(Resource, Clone)]
pub struct GridCache {
    inner: Arc<Mutex<Inner>>,
}

impl Default for GridCache {
    fn default() -> Self {
        Self::with_capacity(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl GridCache {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                grids: LruCache::new(capacity),
                metrics: GridMetrics::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_or_build(&self, shape: GridShape, tier: QualityTier) -> Arc<SampleGrid> {
        let key = GridKey { shape, tier };
        let mut inner = self.lock();
        if let Some(grid) = inner.grids.get(&key).cloned() {
            inner.metrics.cache_hits += 1;
            return grid;
        }

        let grid = Arc::new(SampleGrid::build(shape, tier));
        debug!("Built {:?} grid for {} quality: {} samples", shape, tier.label(), grid.len());
        inner.grids.put(key, grid.clone());
        inner.metrics.grids_built += 1;
        grid
    }

    pub fn metrics(&self) -> GridMetrics {
        self.lock().metrics
    }

    pub fn clear(&self) {
        self.lock().grids.clear();
    }
}
