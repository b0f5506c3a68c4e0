//! Chunk records and geometry
//!
//! A chunk is a fixed-size cell of terrain addressed by integer coordinates.
//! Records hold the raw scalar field (heightmap) and the triangle geometry
//! derived from it; a record with geometry is "resident".

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Integer chunk coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    /// Create a new chunk key
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Key of the chunk containing a world position
    pub fn from_world(position: Vec3, chunk_size: f32) -> Self {
        Self {
            x: (position.x / chunk_size).floor() as i32,
            y: (position.y / chunk_size).floor() as i32,
            z: (position.z / chunk_size).floor() as i32,
        }
    }

    /// World-space center of this chunk
    pub fn center(&self, chunk_size: f32) -> Vec3 {
        Vec3::new(
            (self.x as f32 + 0.5) * chunk_size,
            (self.y as f32 + 0.5) * chunk_size,
            (self.z as f32 + 0.5) * chunk_size,
        )
    }

    /// World-space minimum corner of this chunk
    pub fn min_corner(&self, chunk_size: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * chunk_size,
            self.y as f32 * chunk_size,
            self.z as f32 * chunk_size,
        )
    }

    /// Chebyshev distance to another key, in chunks
    pub fn chunk_distance(&self, other: &ChunkKey) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }

    /// Whether two keys address the same vertical column
    pub fn same_column(&self, other: &ChunkKey) -> bool {
        self.x == other.x && self.z == other.z
    }
}

/// A single terrain triangle in world space
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Face normal (not normalized against degenerate triangles)
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    /// Centroid
    pub fn center(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Angle between the face normal and world up, in degrees
    pub fn slope_degrees(&self) -> f32 {
        let n = self.normal();
        n.y.clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Whether the XZ projection of this triangle contains `(x, z)`
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        let (ax, az) = (self.a.x, self.a.z);
        let (bx, bz) = (self.b.x, self.b.z);
        let (cx, cz) = (self.c.x, self.c.z);

        let d = (bz - cz) * (ax - cx) + (cx - bx) * (az - cz);
        if d.abs() < 1e-9 {
            return false;
        }
        let u = ((bz - cz) * (x - cx) + (cx - bx) * (z - cz)) / d;
        let v = ((cz - az) * (x - cx) + (ax - cx) * (z - cz)) / d;
        let w = 1.0 - u - v;
        (-1e-4..=1.0 + 1e-4).contains(&u)
            && (-1e-4..=1.0 + 1e-4).contains(&v)
            && (-1e-4..=1.0 + 1e-4).contains(&w)
    }

    /// Surface height at `(x, z)`, if the triangle covers that point
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if !self.contains_xz(x, z) {
            return None;
        }
        let n = self.normal();
        if n.y.abs() < 1e-6 {
            return None; // Vertical face, no unique height
        }
        // Plane equation: n . (p - a) = 0, solve for y
        let y = self.a.y - (n.x * (x - self.a.x) + n.z * (z - self.a.z)) / n.y;
        Some(y)
    }
}

/// Derived collision/visual geometry for one chunk
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkGeometry {
    /// Owning chunk
    pub key: ChunkKey,
    /// World-space triangle soup
    pub triangles: Vec<Triangle>,
}

impl ChunkGeometry {
    /// Create geometry for a chunk
    pub fn new(key: ChunkKey, triangles: Vec<Triangle>) -> Self {
        Self { key, triangles }
    }

    /// Empty geometry (chunk contains no surface)
    pub fn empty(key: ChunkKey) -> Self {
        Self {
            key,
            triangles: Vec::new(),
        }
    }

    /// Whether the chunk contributes any surface at all
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Highest surface height under `(x, z)`, if covered
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.triangles
            .iter()
            .filter_map(|t| t.height_at(x, z))
            .fold(None, |best, h| match best {
                Some(b) if b >= h => Some(b),
                _ => Some(h),
            })
    }
}

/// Raw scalar field for one chunk: a grid of surface heights
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalarField {
    /// Owning chunk
    pub key: ChunkKey,
    /// Samples per side (grid is `resolution + 1` vertices wide)
    pub resolution: usize,
    /// Row-major height samples, `(resolution + 1)^2` entries
    pub heights: Vec<f32>,
}

impl ScalarField {
    /// Create a field from samples
    pub fn new(key: ChunkKey, resolution: usize, heights: Vec<f32>) -> Self {
        debug_assert_eq!(heights.len(), (resolution + 1) * (resolution + 1));
        Self {
            key,
            resolution,
            heights,
        }
    }

    /// Height sample at grid coordinates
    pub fn sample(&self, i: usize, j: usize) -> f32 {
        self.heights[j * (self.resolution + 1) + i]
    }

    /// Triangulate into world-space chunk geometry (two triangles per cell)
    pub fn triangulate(&self, chunk_size: f32) -> ChunkGeometry {
        let origin = self.key.min_corner(chunk_size);
        let step = chunk_size / self.resolution as f32;
        let mut triangles = Vec::with_capacity(self.resolution * self.resolution * 2);

        let vertex = |field: &Self, i: usize, j: usize| {
            Vec3::new(
                origin.x + i as f32 * step,
                field.sample(i, j),
                origin.z + j as f32 * step,
            )
        };

        for j in 0..self.resolution {
            for i in 0..self.resolution {
                let v00 = vertex(self, i, j);
                let v10 = vertex(self, i + 1, j);
                let v01 = vertex(self, i, j + 1);
                let v11 = vertex(self, i + 1, j + 1);
                // Counter-clockwise seen from above (+Y)
                triangles.push(Triangle::new(v00, v01, v10));
                triangles.push(Triangle::new(v10, v01, v11));
            }
        }

        ChunkGeometry::new(self.key, triangles)
    }
}

/// Result of chunk generation, delivered by the worker pool
#[derive(Clone, Debug)]
pub enum ChunkPayload {
    /// Raw scalar field; the cache derives geometry from it
    Field(ScalarField),
    /// Pre-built geometry
    Geometry(ChunkGeometry),
}

/// One tracked chunk in the streaming cache
#[derive(Clone, Debug)]
pub struct ChunkRecord {
    /// Chunk coordinates
    pub key: ChunkKey,
    /// Raw scalar field, if the generator delivered one
    pub field: Option<ScalarField>,
    /// Derived geometry; present iff the chunk is resident
    pub geometry: Option<Arc<ChunkGeometry>>,
    /// Session time of the last access by any agent
    pub last_access: f64,
    /// A generation request is in flight
    pub pending: bool,
}

impl ChunkRecord {
    /// Create a record for a freshly requested chunk
    pub fn requested(key: ChunkKey, now: f64) -> Self {
        Self {
            key,
            field: None,
            geometry: None,
            last_access: now,
            pending: true,
        }
    }

    /// Whether geometry is resident and usable for collision/navmesh
    pub fn is_resident(&self) -> bool {
        self.geometry.is_some()
    }

    /// Refresh the last access time
    pub fn touch(&mut self, now: f64) {
        self.last_access = now;
    }

    /// Whether this record may be evicted at `now`
    pub fn is_stale(&self, now: f64, evict_after: f64) -> bool {
        !self.pending && now - self.last_access > evict_after
    }
}
