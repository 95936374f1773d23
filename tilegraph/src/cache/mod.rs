//! Byte-budgeted cache of decoded graph tiles.
//!
//! Tiles are loaded from a [`TileStorage`] on first access, decoded once and
//! handed out as reference-counted [`TileHandle`]s. The cache never evicts on
//! its own: callers check [`TileCache::over_committed`] and call
//! [`TileCache::trim`], which reclaims least-recently-used tiles that no
//! handle refers to.
//!
//! # Concurrency
//!
//! The tile map, the resident byte counter and the statistics live behind a
//! single `parking_lot::Mutex`. Loads run under that lock, so a tile is
//! never loaded twice. Handles are immutable and can be shared freely.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::graph::{GraphId, GraphTile, TileDecodeError};
use crate::storage::{StorageError, TileStorage};

/// Shared, immutable reference to a cached tile.
pub type TileHandle = Arc<GraphTile>;

/// Default resident budget: 1 GiB.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1024 * 1024 * 1024;

/// Errors raised when a tile cannot be provided.
#[derive(Debug, Error)]
pub enum TileCacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Tile {graph_id} is corrupt: {source}")]
    Decode {
        graph_id: GraphId,
        #[source]
        source: TileDecodeError,
    },

    #[error("Storage returned tile {found} for {requested}")]
    Mismatch { requested: GraphId, found: GraphId },
}

/// Counters describing cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the resident set.
    pub hits: u64,
    /// Lookups that went to storage.
    pub misses: u64,
    /// Storage loads that failed or returned undecodable bytes.
    pub failed_loads: u64,
    /// Tiles removed by [`TileCache::trim`].
    pub evictions: u64,
    pub size_bytes: usize,
    pub max_size_bytes: usize,
    pub entry_count: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from memory.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Result of a trim pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimResult {
    /// Number of tiles evicted.
    pub entries_removed: usize,
    /// Total tile bytes released.
    pub bytes_freed: usize,
    /// Tiles over budget that stayed resident because a handle refers to them.
    pub pinned_entries: usize,
    /// Duration of the trim in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for TrimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trim: removed {} tiles, freed {} bytes ({} pinned) in {}ms",
            self.entries_removed, self.bytes_freed, self.pinned_entries, self.duration_ms
        )
    }
}

struct CacheState {
    tiles: LruCache<GraphId, TileHandle>,
    size_bytes: usize,
    stats: CacheStats,
}

/// Memory-bounded map from tile id to decoded tile.
pub struct TileCache {
    storage: Arc<dyn TileStorage>,
    max_size_bytes: usize,
    state: Mutex<CacheState>,
}

impl TileCache {
    /// Create a cache over `storage` with a resident budget in bytes.
    pub fn new(storage: Arc<dyn TileStorage>, max_size_bytes: usize) -> Self {
        Self {
            storage,
            max_size_bytes,
            state: Mutex::new(CacheState {
                tiles: LruCache::unbounded(),
                size_bytes: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Get a tile, loading it on first access.
    ///
    /// Returns `None` when the tile does not exist or cannot be decoded;
    /// failures are logged, missing tiles are not.
    pub fn get_tile(&self, graph_id: GraphId) -> Option<TileHandle> {
        match self.try_get_tile(graph_id) {
            Ok(tile) => Some(tile),
            Err(TileCacheError::Storage(StorageError::NotFound(_))) => None,
            Err(e) => {
                warn!(tile = %graph_id.tile_base(), error = %e, "Failed to load tile");
                None
            }
        }
    }

    /// Get a tile, reporting why it is unavailable.
    ///
    /// # Errors
    ///
    /// [`TileCacheError::Storage`] when storage has no such tile or fails,
    /// [`TileCacheError::Decode`] when its bytes are not a valid tile, or
    /// [`TileCacheError::Mismatch`] when they hold a different tile.
    pub fn try_get_tile(&self, graph_id: GraphId) -> Result<TileHandle, TileCacheError> {
        let key = graph_id.tile_base();
        let mut state = self.state.lock();

        if let Some(tile) = state.tiles.get(&key) {
            let tile = Arc::clone(tile);
            state.stats.hits += 1;
            return Ok(tile);
        }
        state.stats.misses += 1;

        let data = match self.storage.load(key) {
            Ok(data) => data,
            Err(e) => {
                state.stats.failed_loads += 1;
                debug!(tile = %key, error = %e, "Tile not available from storage");
                return Err(e.into());
            }
        };
        let tile = match GraphTile::from_bytes(data) {
            Ok(tile) if tile.graph_id() == key => tile,
            Ok(tile) => {
                state.stats.failed_loads += 1;
                return Err(TileCacheError::Mismatch {
                    requested: key,
                    found: tile.graph_id(),
                });
            }
            Err(source) => {
                state.stats.failed_loads += 1;
                return Err(TileCacheError::Decode {
                    graph_id: key,
                    source,
                });
            }
        };

        let tile = Arc::new(tile);
        state.size_bytes += tile.size_bytes();
        state.tiles.put(key, Arc::clone(&tile));
        debug!(
            tile = %key,
            bytes = tile.size_bytes(),
            resident_bytes = state.size_bytes,
            "Loaded tile"
        );
        Ok(tile)
    }

    /// Whether the resident tiles exceed the budget.
    pub fn over_committed(&self) -> bool {
        self.state.lock().size_bytes > self.max_size_bytes
    }

    /// Evict least-recently-used tiles nobody holds a handle to until the
    /// resident size is within budget.
    pub fn trim(&self) -> TrimResult {
        let start = Instant::now();
        let mut state = self.state.lock();
        let mut result = TrimResult::default();

        let excess = state.size_bytes.saturating_sub(self.max_size_bytes);
        if excess > 0 {
            let mut victims = Vec::new();
            for (key, tile) in state.tiles.iter().rev() {
                if result.bytes_freed >= excess {
                    break;
                }
                if Arc::strong_count(tile) == 1 {
                    result.bytes_freed += tile.size_bytes();
                    victims.push(*key);
                } else {
                    result.pinned_entries += 1;
                }
            }
            for key in victims {
                if state.tiles.pop(&key).is_some() {
                    result.entries_removed += 1;
                }
            }
            state.size_bytes -= result.bytes_freed;
            state.stats.evictions += result.entries_removed as u64;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        if result.entries_removed > 0 || result.pinned_entries > 0 {
            debug!(
                removed = result.entries_removed,
                freed = result.bytes_freed,
                pinned = result.pinned_entries,
                resident_bytes = state.size_bytes,
                "Trimmed tile cache"
            );
        }
        result
    }

    /// Drop every resident tile. Outstanding handles stay valid.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tiles.clear();
        state.size_bytes = 0;
    }

    /// Whether the tile of `graph_id` is resident. Does not count as a use.
    pub fn contains(&self, graph_id: GraphId) -> bool {
        self.state.lock().tiles.contains(&graph_id.tile_base())
    }

    pub fn size_bytes(&self) -> usize {
        self.state.lock().size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().tiles.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size_bytes: state.size_bytes,
            max_size_bytes: self.max_size_bytes,
            entry_count: state.tiles.len(),
            ..state.stats.clone()
        }
    }
}

impl fmt::Debug for TileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("max_size_bytes", &self.max_size_bytes)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
