//! Background navmesh rebuilds
//!
//! The service owns the current mesh behind an `Arc` and swaps in a
//! replacement when a background build completes. Queries issued during a
//! rebuild are answered by the previous mesh, never by a partial one.

use crate::mesh::NavMesh;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use drift_terrain::ChunkGeometry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Navigation tuning
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NavConfig {
    /// Steepest walkable face, degrees from horizontal
    pub max_slope_degrees: f32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            max_slope_degrees: 50.0,
        }
    }
}

impl NavConfig {
    pub fn with_max_slope_degrees(mut self, degrees: f32) -> Self {
        self.max_slope_degrees = degrees;
        self
    }
}

/// Owns the current navmesh and rebuilds it off-thread when terrain changes
pub struct NavMeshService {
    config: NavConfig,
    current: Arc<NavMesh>,
    dirty: bool,
    building: bool,
    sender: Sender<NavMesh>,
    receiver: Receiver<NavMesh>,
}

impl NavMeshService {
    pub fn new(config: NavConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            config,
            current: Arc::new(NavMesh::default()),
            dirty: false,
            building: false,
            sender,
            receiver,
        }
    }

    /// The mesh all queries should run against
    pub fn mesh(&self) -> Arc<NavMesh> {
        Arc::clone(&self.current)
    }

    pub fn region_count(&self) -> usize {
        self.current.region_count()
    }

    /// Record that the walkable surface changed since the last build started
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_building(&self) -> bool {
        self.building
    }

    /// Start a background rebuild over a geometry snapshot.
    ///
    /// No-op while a build is already in flight; the dirty flag stays set so
    /// the next kick after completion picks up the missed changes. Returns
    /// whether a build was started.
    pub fn kick_rebuild(&mut self, geometry: Vec<Arc<ChunkGeometry>>) -> bool {
        if self.building || !self.dirty {
            return false;
        }
        self.dirty = false;
        self.building = true;

        let sender = self.sender.clone();
        let max_slope = self.config.max_slope_degrees;
        std::thread::spawn(move || {
            let mesh = NavMesh::build(&geometry, max_slope);
            // Receiver dropped means the service is gone; nothing to do
            let _ = sender.send(mesh);
        });
        true
    }

    /// Swap in a completed build if one is ready. Returns whether the
    /// current mesh changed.
    pub fn poll(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(mesh) => {
                log::debug!(
                    "Navmesh swap: {} -> {} regions",
                    self.current.region_count(),
                    mesh.region_count()
                );
                self.current = Arc::new(mesh);
                self.building = false;
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Build and swap on the calling thread
    pub fn rebuild_blocking(&mut self, geometry: &[Arc<ChunkGeometry>]) {
        self.current = Arc::new(NavMesh::build(geometry, self.config.max_slope_degrees));
        self.dirty = false;
    }
}
