//! Chunk generation worker pool
//!
//! Generation runs on background threads so the simulation tick never
//! blocks. Requests go into a priority heap; completions come back over a
//! channel and are drained at the top of the next tick.

use crate::cache::TerrainProvider;
use crate::chunk::{ChunkKey, ChunkPayload, ScalarField};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Generates the content of a single chunk
pub trait ChunkSource: Send + Sync + 'static {
    /// Produce the payload for `key`; runs on a worker thread
    fn generate(&self, key: ChunkKey) -> ChunkPayload;
}

/// A pending generation request, ordered by priority
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GenRequest {
    key: ChunkKey,
    priority: i32,
    /// Tie-break: earlier requests first
    sequence: u64,
}

impl Ord for GenRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for GenRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct SharedQueue {
    heap: Mutex<BinaryHeap<GenRequest>>,
    available: Condvar,
}

/// Pool of worker threads that generate chunk content by priority
pub struct GeneratorPool {
    queue: Arc<SharedQueue>,
    results: Receiver<(ChunkKey, ChunkPayload)>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    sequence: u64,
}

impl GeneratorPool {
    /// Spawn `workers` threads running `source`
    pub fn new(source: Arc<dyn ChunkSource>, workers: usize) -> Self {
        let queue = Arc::new(SharedQueue {
            heap: Mutex::new(BinaryHeap::new()),
            available: Condvar::new(),
        });
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::unbounded();

        let handles = (0..workers.max(1))
            .map(|_| {
                let queue = Arc::clone(&queue);
                let shutdown = Arc::clone(&shutdown);
                let source = Arc::clone(&source);
                let tx: Sender<(ChunkKey, ChunkPayload)> = tx.clone();
                std::thread::spawn(move || worker_loop(&queue, &shutdown, source.as_ref(), &tx))
            })
            .collect();

        Self {
            queue,
            results: rx,
            shutdown,
            workers: handles,
            sequence: 0,
        }
    }

    /// Drain all completed generations without blocking
    pub fn drain_completed(&self) -> Vec<(ChunkKey, ChunkPayload)> {
        self.results.try_iter().collect()
    }

    /// Block up to `timeout` for one completion (test and shutdown helper)
    pub fn recv_completed_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Option<(ChunkKey, ChunkPayload)> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Number of requests still queued (not yet picked up by a worker)
    pub fn queued(&self) -> usize {
        self.queue.heap.lock().len()
    }
}

impl TerrainProvider for GeneratorPool {
    fn request(&mut self, key: ChunkKey, priority: i32) -> bool {
        if self.shutdown.load(AtomicOrdering::Relaxed) {
            return false;
        }
        self.sequence += 1;
        self.queue.heap.lock().push(GenRequest {
            key,
            priority,
            sequence: self.sequence,
        });
        self.queue.available.notify_one();
        true
    }
}

impl Drop for GeneratorPool {
    fn drop(&mut self) {
        self.shutdown.store(true, AtomicOrdering::Relaxed);
        self.queue.available.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    queue: &SharedQueue,
    shutdown: &AtomicBool,
    source: &dyn ChunkSource,
    tx: &Sender<(ChunkKey, ChunkPayload)>,
) {
    loop {
        let request = {
            let mut heap = queue.heap.lock();
            loop {
                if shutdown.load(AtomicOrdering::Relaxed) {
                    return;
                }
                if let Some(request) = heap.pop() {
                    break request;
                }
                queue.available.wait(&mut heap);
            }
        };

        let payload = source.generate(request.key);
        if tx.send((request.key, payload)).is_err() {
            return; // Pool dropped
        }
    }
}

/// Simple procedural heightfield source: rolling sine hills on the y=0 layer
///
/// Chunks outside the surface layer come back empty so vertical streaming
/// windows do not fabricate terrain above or below the ground.
#[derive(Clone, Debug)]
pub struct HeightfieldSource {
    /// Edge length of a chunk, world units
    pub chunk_size: f32,
    /// Samples per chunk side
    pub resolution: usize,
    /// Base ground height
    pub base: f32,
    /// Hill height
    pub amplitude: f32,
    /// Hill wavelength, world units
    pub wavelength: f32,
}

impl Default for HeightfieldSource {
    fn default() -> Self {
        Self {
            chunk_size: 16.0,
            resolution: 8,
            base: 0.0,
            amplitude: 2.0,
            wavelength: 64.0,
        }
    }
}

impl HeightfieldSource {
    /// A perfectly flat world at `height`
    pub fn flat(chunk_size: f32, height: f32) -> Self {
        Self {
            chunk_size,
            resolution: 2,
            base: height,
            amplitude: 0.0,
            wavelength: 1.0,
        }
    }
}

impl ChunkSource for HeightfieldSource {
    fn generate(&self, key: ChunkKey) -> ChunkPayload {
        if key.y != 0 {
            return ChunkPayload::Geometry(crate::chunk::ChunkGeometry::empty(key));
        }

        let side = self.resolution + 1;
        let origin = key.min_corner(self.chunk_size);
        let step = self.chunk_size / self.resolution as f32;
        let mut heights = Vec::with_capacity(side * side);
        let k = std::f32::consts::TAU / self.wavelength;

        for j in 0..side {
            for i in 0..side {
                let x = origin.x + i as f32 * step;
                let z = origin.z + j as f32 * step;
                heights.push(self.base + self.amplitude * ((x * k).sin() + (z * k).cos()) * 0.5);
            }
        }

        ChunkPayload::Field(ScalarField::new(key, self.resolution, heights))
    }
}
