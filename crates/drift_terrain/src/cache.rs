//! Terrain streaming cache
//!
//! Tracks which chunks are resident, requests missing ones through a
//! [`TerrainProvider`] with distance-derived priority, and evicts records
//! that no agent has touched for a while. Only this cache mutates chunk
//! records; everything else reads shared geometry through `Arc`s.

use crate::chunk::{ChunkGeometry, ChunkKey, ChunkPayload, ChunkRecord};
use crate::error::{Result, TerrainError};
use drift_core::AgentId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for the streaming system
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Edge length of a cubic chunk, world units
    pub chunk_size: f32,

    /// Horizontal streaming window radius, in chunks
    pub horizontal_radius: i32,

    /// Vertical streaming window radius, in chunks
    pub vertical_radius: i32,

    /// Seconds a record may go untouched before eviction
    pub evict_after: f64,

    /// Minimum interval between `ensure_resident` runs for one agent
    pub refresh_interval: f64,

    /// Lowest request priority (furthest chunks)
    pub min_priority: i32,

    /// Highest request priority (the agent's own chunk)
    pub max_priority: i32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16.0,
            horizontal_radius: 2,
            vertical_radius: 1,
            evict_after: 30.0,
            refresh_interval: 0.5,
            min_priority: 0,
            max_priority: 10,
        }
    }
}

impl StreamingConfig {
    /// Set the chunk size
    pub fn with_chunk_size(mut self, size: f32) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the streaming window radii
    pub fn with_radii(mut self, horizontal: i32, vertical: i32) -> Self {
        self.horizontal_radius = horizontal;
        self.vertical_radius = vertical;
        self
    }

    /// Set the eviction threshold
    pub fn with_evict_after(mut self, seconds: f64) -> Self {
        self.evict_after = seconds;
        self
    }

    /// Set the per-agent refresh throttle
    pub fn with_refresh_interval(mut self, seconds: f64) -> Self {
        self.refresh_interval = seconds;
        self
    }
}

/// Collaborator that generates chunk content asynchronously
///
/// `request` must not block; completions come back through whatever channel
/// the provider owns and are fed to [`TerrainStreamingCache::on_generated`].
pub trait TerrainProvider {
    /// Ask for generation of `key` at `priority` (higher = sooner).
    /// Returns whether the request was accepted.
    fn request(&mut self, key: ChunkKey, priority: i32) -> bool;
}

/// Streaming statistics for diagnostics
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingStats {
    pub tracked: usize,
    pub resident: usize,
    pub pending: usize,
}

/// Bounded, access-driven cache of terrain chunk records
#[derive(Default)]
pub struct TerrainStreamingCache {
    /// All tracked chunks
    records: HashMap<ChunkKey, ChunkRecord>,
    /// Last `ensure_resident` time per agent
    refresh: HashMap<AgentId, f64>,
    /// Configuration
    config: StreamingConfig,
}

impl TerrainStreamingCache {
    /// Create a cache
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            records: HashMap::new(),
            refresh: HashMap::new(),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Ensure chunks around `position` are resident or requested.
    ///
    /// Throttled per agent to at most once per `refresh_interval`. Requests
    /// are issued closest-first with priority falling off per chunk of
    /// distance; a key that is already pending is never requested twice.
    /// Returns the number of new requests issued.
    pub fn ensure_resident(
        &mut self,
        agent: AgentId,
        position: Vec3,
        now: f64,
        provider: &mut dyn TerrainProvider,
    ) -> usize {
        if let Some(last) = self.refresh.get(&agent) {
            if now - last < self.config.refresh_interval {
                return 0;
            }
        }
        self.refresh.insert(agent, now);

        let origin = ChunkKey::from_world(position, self.config.chunk_size);
        let mut window = self.window_keys(origin);
        window.sort_by_key(|key| origin.chunk_distance(key));

        let mut issued = 0;
        for key in window {
            if let Some(record) = self.records.get_mut(&key) {
                record.touch(now);
                continue;
            }

            let distance = origin.chunk_distance(&key);
            let priority = (self.config.max_priority - distance)
                .clamp(self.config.min_priority, self.config.max_priority);

            if provider.request(key, priority) {
                self.records.insert(key, ChunkRecord::requested(key, now));
                issued += 1;
            } else {
                log::warn!("Chunk request rejected for {:?}", key);
            }
        }

        issued
    }

    /// Store a completed generation result.
    ///
    /// Returns whether the navigable surface changed (the navmesh should be
    /// marked dirty). A completion for an untracked key is a stale delivery.
    pub fn on_generated(&mut self, key: ChunkKey, payload: ChunkPayload, now: f64) -> Result<bool> {
        let record = self
            .records
            .get_mut(&key)
            .ok_or(TerrainError::UnknownChunk(key))?;

        let had_surface = record
            .geometry
            .as_ref()
            .map(|g| !g.is_empty())
            .unwrap_or(false);

        let geometry = match payload {
            ChunkPayload::Field(field) => {
                let geometry = field.triangulate(self.config.chunk_size);
                record.field = Some(field);
                geometry
            }
            ChunkPayload::Geometry(geometry) => geometry,
        };

        let has_surface = !geometry.is_empty();
        record.geometry = Some(Arc::new(geometry));
        record.pending = false;
        record.touch(now);

        Ok(had_surface || has_surface)
    }

    /// Drop records idle past the eviction threshold.
    ///
    /// A record with an in-flight request is never evicted. Returns the
    /// number of records removed.
    pub fn evict(&mut self, now: f64) -> usize {
        let evict_after = self.config.evict_after;
        let before = self.records.len();
        self.records.retain(|key, record| {
            let stale = record.is_stale(now, evict_after);
            if stale {
                log::debug!("Evicting chunk {:?}", key);
            }
            !stale
        });
        before - self.records.len()
    }

    /// Forget per-agent throttle state (call on despawn)
    pub fn forget_agent(&mut self, agent: AgentId) {
        self.refresh.remove(&agent);
    }

    /// Whether a chunk is resident
    pub fn is_resident(&self, key: ChunkKey) -> bool {
        self.records
            .get(&key)
            .map(ChunkRecord::is_resident)
            .unwrap_or(false)
    }

    /// Look up a tracked record
    pub fn record(&self, key: ChunkKey) -> Option<&ChunkRecord> {
        self.records.get(&key)
    }

    /// Snapshot of all resident geometry (shared, cheap to clone)
    pub fn resident_geometry(&self) -> Vec<Arc<ChunkGeometry>> {
        self.records
            .values()
            .filter_map(|r| r.geometry.clone())
            .filter(|g| !g.is_empty())
            .collect()
    }

    /// Highest resident surface height under `(x, z)`, if any chunk covers it
    pub fn ground_height(&self, x: f32, z: f32) -> Option<f32> {
        let column = ChunkKey::from_world(Vec3::new(x, 0.0, z), self.config.chunk_size);
        self.records
            .values()
            .filter(|r| r.key.same_column(&column))
            .filter_map(|r| r.geometry.as_ref())
            .filter_map(|g| g.height_at(x, z))
            .fold(None, |best, h| match best {
                Some(b) if b >= h => Some(b),
                _ => Some(h),
            })
    }

    /// Whether resident terrain blocks the line of sight from `from` to `to`
    pub fn line_blocked(&self, from: Vec3, to: Vec3) -> bool {
        const STEPS: usize = 8;
        for i in 1..STEPS {
            let t = i as f32 / STEPS as f32;
            let p = from.lerp(to, t);
            if let Some(h) = self.ground_height(p.x, p.z) {
                if h > p.y + 0.1 {
                    return true;
                }
            }
        }
        false
    }

    /// Streaming statistics
    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            tracked: self.records.len(),
            resident: self.records.values().filter(|r| r.is_resident()).count(),
            pending: self.records.values().filter(|r| r.pending).count(),
        }
    }

    fn window_keys(&self, origin: ChunkKey) -> Vec<ChunkKey> {
        let (rh, rv) = (self.config.horizontal_radius, self.config.vertical_radius);
        let mut keys = Vec::with_capacity(((2 * rh + 1) * (2 * rh + 1) * (2 * rv + 1)) as usize);
        for dy in -rv..=rv {
            for dz in -rh..=rh {
                for dx in -rh..=rh {
                    keys.push(ChunkKey::new(origin.x + dx, origin.y + dy, origin.z + dz));
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ScalarField;

    /// Provider that records every request it sees
    #[derive(Default)]
    struct RecordingProvider {
        requests: Vec<(ChunkKey, i32)>,
    }

    impl TerrainProvider for RecordingProvider {
        fn request(&mut self, key: ChunkKey, priority: i32) -> bool {
            self.requests.push((key, priority));
            true
        }
    }

    fn flat_payload(key: ChunkKey) -> ChunkPayload {
        ChunkPayload::Field(ScalarField::new(key, 1, vec![0.0; 4]))
    }

    fn agent(n: u32) -> AgentId {
        AgentId::new(n, 0)
    }

    #[test]
    fn test_requests_are_deduplicated() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(1, 0));
        let mut provider = RecordingProvider::default();

        cache.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider);
        let first = provider.requests.len();
        assert!(first > 0);

        // Second agent, same window, same instant: all keys already pending
        cache.ensure_resident(agent(1), Vec3::ZERO, 0.0, &mut provider);
        assert_eq!(provider.requests.len(), first);
    }

    #[test]
    fn test_refresh_throttle() {
        let mut cache = TerrainStreamingCache::new(
            StreamingConfig::default()
                .with_radii(1, 0)
                .with_refresh_interval(0.5),
        );
        let mut provider = RecordingProvider::default();

        assert!(cache.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider) > 0);
        // Within the throttle window nothing happens, even far away
        let far = Vec3::new(500.0, 0.0, 500.0);
        assert_eq!(cache.ensure_resident(agent(0), far, 0.2, &mut provider), 0);
        // After the interval the new window is requested
        assert!(cache.ensure_resident(agent(0), far, 0.7, &mut provider) > 0);
    }

    #[test]
    fn test_priority_falls_off_with_distance() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(2, 0));
        let mut provider = RecordingProvider::default();

        cache.ensure_resident(agent(0), Vec3::new(8.0, 8.0, 8.0), 0.0, &mut provider);

        let origin = ChunkKey::new(0, 0, 0);
        let own = provider
            .requests
            .iter()
            .find(|(k, _)| *k == origin)
            .unwrap();
        let far = provider
            .requests
            .iter()
            .find(|(k, _)| origin.chunk_distance(k) == 2)
            .unwrap();
        assert!(own.1 > far.1);

        let config = StreamingConfig::default();
        for (_, priority) in &provider.requests {
            assert!(*priority >= config.min_priority && *priority <= config.max_priority);
        }
    }

    #[test]
    fn test_on_generated_marks_surface_change() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0));
        let mut provider = RecordingProvider::default();
        cache.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider);

        let key = ChunkKey::new(0, 0, 0);
        let changed = cache.on_generated(key, flat_payload(key), 1.0).unwrap();
        assert!(changed);
        assert!(cache.is_resident(key));

        // Empty geometry for a chunk that never had surface: no change
        let mut cache2 = TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0));
        cache2.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider);
        let changed = cache2
            .on_generated(key, ChunkPayload::Geometry(ChunkGeometry::empty(key)), 1.0)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_on_generated_unknown_key() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default());
        let key = ChunkKey::new(9, 9, 9);
        assert!(matches!(
            cache.on_generated(key, flat_payload(key), 0.0),
            Err(TerrainError::UnknownChunk(_))
        ));
    }

    #[test]
    fn test_eviction_spares_pending_records() {
        let mut cache =
            TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0).with_evict_after(10.0));
        let mut provider = RecordingProvider::default();
        cache.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider);

        // Way past the threshold, but the request is still in flight
        assert_eq!(cache.evict(1000.0), 0);
        assert!(cache.record(ChunkKey::new(0, 0, 0)).is_some());

        // Once generated and idle, it goes
        let key = ChunkKey::new(0, 0, 0);
        cache.on_generated(key, flat_payload(key), 1000.0).unwrap();
        assert_eq!(cache.evict(2000.0), 1);
        assert!(cache.record(key).is_none());
    }

    #[test]
    fn test_touch_defers_eviction() {
        let mut cache =
            TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0).with_evict_after(10.0));
        let mut provider = RecordingProvider::default();
        cache.ensure_resident(agent(0), Vec3::ZERO, 0.0, &mut provider);
        let key = ChunkKey::new(0, 0, 0);
        cache.on_generated(key, flat_payload(key), 0.0).unwrap();

        // Another agent keeps touching the chunk
        cache.ensure_resident(agent(1), Vec3::ZERO, 9.0, &mut provider);
        assert_eq!(cache.evict(15.0), 0);
    }

    #[test]
    fn test_ground_height() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0));
        let mut provider = RecordingProvider::default();
        cache.ensure_resident(agent(0), Vec3::new(8.0, 2.0, 8.0), 0.0, &mut provider);

        assert!(cache.ground_height(8.0, 8.0).is_none());

        let key = ChunkKey::new(0, 0, 0);
        let field = ScalarField::new(key, 1, vec![3.0; 4]);
        cache
            .on_generated(key, ChunkPayload::Field(field), 0.0)
            .unwrap();

        let h = cache.ground_height(8.0, 8.0).unwrap();
        assert!((h - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_line_blocked_by_ridge() {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0));
        let mut provider = RecordingProvider::default();
        cache.ensure_resident(agent(0), Vec3::new(8.0, 0.0, 8.0), 0.0, &mut provider);

        let key = ChunkKey::new(0, 0, 0);
        let field = ScalarField::new(key, 1, vec![5.0; 4]);
        cache
            .on_generated(key, ChunkPayload::Field(field), 0.0)
            .unwrap();

        // Sight line at y=1 across a 5-high plateau
        let blocked = cache.line_blocked(Vec3::new(1.0, 1.0, 8.0), Vec3::new(15.0, 1.0, 8.0));
        assert!(blocked);
        // Above the plateau the line is clear
        let clear = cache.line_blocked(Vec3::new(1.0, 8.0, 8.0), Vec3::new(15.0, 8.0, 8.0));
        assert!(!clear);
    }
}
