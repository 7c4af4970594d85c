use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::model::Structure;
use crate::scan::build_structure;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
struct CacheEntry {
    structure: Arc<Structure>,
    cached_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    // Bumped on every invalidation so a rebuild that started before a write
    // never stores its stale result afterwards.
    generation: u64,
}

/// Time-bounded memo of the last `Structure` built for one shaders root.
///
/// The lock only guards the entry itself; rebuilds run without it, so
/// concurrent misses may each walk the tree. That is harmless because a
/// rebuild only reads the filesystem.
#[derive(Debug)]
pub struct StructureCache {
    root: PathBuf,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl StructureCache {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub async fn get_structure(&self) -> Result<Arc<Structure>, StoreError> {
        self.get_structure_at(Instant::now()).await
    }

    async fn get_structure_at(&self, now: Instant) -> Result<Arc<Structure>, StoreError> {
        let generation = {
            let state = self.state.lock();
            if let Some(entry) = state.entry.as_ref() {
                if now.saturating_duration_since(entry.cached_at) < self.ttl {
                    debug!(root = %self.root.display(), "serving shader structure from cache");
                    return Ok(Arc::clone(&entry.structure));
                }
            }
            state.generation
        };

        let rebuilt = build_structure(&self.root).await.map(Arc::new);
        self.record(generation, now, &rebuilt);
        rebuilt
    }

    /// Stores or clears the entry for a rebuild that started at
    /// `generation`. Results from an older generation are dropped.
    fn record(
        &self,
        generation: u64,
        now: Instant,
        rebuilt: &Result<Arc<Structure>, StoreError>,
    ) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        match rebuilt {
            Ok(structure) => {
                state.entry = Some(CacheEntry {
                    structure: Arc::clone(structure),
                    cached_at: now,
                });
                debug!(
                    root = %self.root.display(),
                    chapters = structure.len(),
                    "refreshed shader structure cache"
                );
            }
            Err(_) => state.entry = None,
        }
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        if state.entry.take().is_some() {
            debug!(root = %self.root.display(), "invalidated shader structure cache");
        }
    }

    pub fn is_populated(&self) -> bool {
        self.state.lock().entry.is_some()
    }
}
