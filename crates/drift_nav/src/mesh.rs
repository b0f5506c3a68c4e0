//! Navigation mesh
//!
//! One convex walkable region per terrain triangle below the slope limit,
//! with adjacency derived from shared edges. The region set is immutable
//! once built; a changed world means a new build, never an in-place edit.

use crate::error::{NavError, Result};
use crate::path::NavPath;
use drift_terrain::ChunkGeometry;
use glam::Vec3;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

/// Quantization scale for edge matching (1 cm)
const EDGE_QUANT: f32 = 100.0;

/// Spatial hash cell size for region lookup, world units
const LOOKUP_CELL: f32 = 4.0;

/// A convex walkable region (a single triangle of the walkable surface)
#[derive(Clone, Debug)]
pub struct NavRegion {
    /// Triangle corners in world space
    pub vertices: [Vec3; 3],
    /// Centroid
    pub center: Vec3,
    /// Indices of edge-adjacent regions
    pub neighbors: Vec<usize>,
}

impl NavRegion {
    /// Closest point on this region to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        closest_point_on_triangle(p, self.vertices[0], self.vertices[1], self.vertices[2])
    }
}

/// An immutable walkable-surface graph
#[derive(Clone, Debug, Default)]
pub struct NavMesh {
    regions: Vec<NavRegion>,
    /// Region indices bucketed by XZ cell of their center
    spatial: HashMap<(i32, i32), Vec<usize>>,
}

impl NavMesh {
    /// Build a mesh from resident chunk geometry, keeping faces no steeper
    /// than `max_slope_degrees`
    pub fn build(geometry: &[Arc<ChunkGeometry>], max_slope_degrees: f32) -> Self {
        let mut regions = Vec::new();
        // Edge key -> regions sharing it
        let mut edges: HashMap<(u64, u64), Vec<usize>> = HashMap::new();

        for chunk in geometry {
            for triangle in &chunk.triangles {
                if triangle.slope_degrees() > max_slope_degrees {
                    continue;
                }
                let index = regions.len();
                let vertices = [triangle.a, triangle.b, triangle.c];
                regions.push(NavRegion {
                    vertices,
                    center: triangle.center(),
                    neighbors: Vec::new(),
                });

                let keys = [
                    quantize(vertices[0]),
                    quantize(vertices[1]),
                    quantize(vertices[2]),
                ];
                for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                    edges.entry(edge_key(keys[i], keys[j])).or_default().push(index);
                }
            }
        }

        for sharers in edges.values() {
            for &a in sharers {
                for &b in sharers {
                    if a != b && !regions[a].neighbors.contains(&b) {
                        regions[a].neighbors.push(b);
                    }
                }
            }
        }

        let mut spatial: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (index, region) in regions.iter().enumerate() {
            spatial.entry(lookup_cell(region.center)).or_default().push(index);
        }

        log::debug!("Built navmesh with {} regions", regions.len());
        Self { regions, spatial }
    }

    /// Number of walkable regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Regions (read-only)
    pub fn regions(&self) -> &[NavRegion] {
        &self.regions
    }

    /// Index of the region nearest to `p`
    pub fn nearest_region(&self, p: Vec3) -> Option<usize> {
        if self.regions.is_empty() {
            return None;
        }

        // Widening ring search over the spatial hash, then global fallback.
        // Regions are bucketed by center but matched by closest point, so
        // one ring past the first hit is scanned too before settling.
        let (cx, cz) = lookup_cell(p);
        let mut best: Option<(usize, f32)> = None;
        let mut first_hit: Option<i32> = None;
        for ring in 0..=3 {
            if first_hit.is_some_and(|hit| ring > hit + 1) {
                break;
            }
            for dz in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs().max(dz.abs()) != ring {
                        continue;
                    }
                    if let Some(indices) = self.spatial.get(&(cx + dx, cz + dz)) {
                        for &index in indices {
                            let d = self.regions[index].closest_point(p).distance_squared(p);
                            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                                best = Some((index, d));
                            }
                        }
                    }
                }
            }
            if best.is_some() && first_hit.is_none() {
                first_hit = Some(ring);
            }
        }

        if best.is_none() {
            for (index, region) in self.regions.iter().enumerate() {
                let d = region.closest_point(p).distance_squared(p);
                if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((index, d));
                }
            }
        }

        best.map(|(index, _)| index)
    }

    /// Project an arbitrary point onto the nearest walkable region
    pub fn closest_point(&self, p: Vec3) -> Option<Vec3> {
        self.nearest_region(p)
            .map(|index| self.regions[index].closest_point(p))
    }

    /// Find a waypoint path from `from` to `to`.
    ///
    /// Off-mesh endpoints are substituted by their closest on-mesh points;
    /// an error means the mesh is empty or the endpoints are in disconnected
    /// components, not that an endpoint was slightly off the surface.
    pub fn find_path(&self, from: Vec3, to: Vec3) -> Result<NavPath> {
        let start = self.nearest_region(from).ok_or(NavError::EmptyMesh)?;
        let goal = self.nearest_region(to).ok_or(NavError::EmptyMesh)?;

        let entry = self.regions[start].closest_point(from);
        let exit = self.regions[goal].closest_point(to);

        if start == goal {
            return Ok(NavPath::new(vec![entry, exit]));
        }

        let route = self
            .astar(start, goal)
            .ok_or(NavError::NoRoute { from: start, to: goal })?;

        let mut waypoints = Vec::with_capacity(route.len() + 2);
        waypoints.push(entry);
        // Skip the first and last region centers; the entry/exit points
        // already lie on those regions.
        for &index in route.iter().skip(1).take(route.len().saturating_sub(2)) {
            waypoints.push(self.regions[index].center);
        }
        waypoints.push(exit);

        Ok(NavPath::new(waypoints))
    }

    /// A* over the region adjacency graph
    fn astar(&self, start: usize, goal: usize) -> Option<Vec<usize>> {
        #[derive(Clone, Copy)]
        struct Node {
            index: usize,
            f_score: f32,
        }

        impl PartialEq for Node {
            fn eq(&self, other: &Self) -> bool {
                self.index == other.index
            }
        }
        impl Eq for Node {}
        impl PartialOrd for Node {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for Node {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                other
                    .f_score
                    .partial_cmp(&self.f_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        }

        let goal_center = self.regions[goal].center;
        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<usize, usize> = HashMap::new();
        let mut g_score: HashMap<usize, f32> = HashMap::new();
        let mut closed: HashSet<usize> = HashSet::new();

        g_score.insert(start, 0.0);
        open.push(Node {
            index: start,
            f_score: self.regions[start].center.distance(goal_center),
        });

        while let Some(current) = open.pop() {
            if current.index == goal {
                let mut route = vec![goal];
                let mut at = goal;
                while let Some(&prev) = came_from.get(&at) {
                    route.push(prev);
                    at = prev;
                }
                route.reverse();
                return Some(route);
            }

            if !closed.insert(current.index) {
                continue;
            }

            let current_g = *g_score.get(&current.index).unwrap_or(&f32::MAX);
            let current_center = self.regions[current.index].center;

            for &neighbor in &self.regions[current.index].neighbors {
                if closed.contains(&neighbor) {
                    continue;
                }
                let step = current_center.distance(self.regions[neighbor].center);
                let tentative = current_g + step;
                if tentative < *g_score.get(&neighbor).unwrap_or(&f32::MAX) {
                    came_from.insert(neighbor, current.index);
                    g_score.insert(neighbor, tentative);
                    open.push(Node {
                        index: neighbor,
                        f_score: tentative + self.regions[neighbor].center.distance(goal_center),
                    });
                }
            }
        }

        None
    }
}

fn quantize(v: Vec3) -> (i64, i64, i64) {
    (
        (v.x * EDGE_QUANT).round() as i64,
        (v.y * EDGE_QUANT).round() as i64,
        (v.z * EDGE_QUANT).round() as i64,
    )
}

fn edge_key(a: (i64, i64, i64), b: (i64, i64, i64)) -> (u64, u64) {
    let ha = hash_point(a);
    let hb = hash_point(b);
    (ha.min(hb), ha.max(hb))
}

fn hash_point(p: (i64, i64, i64)) -> u64 {
    // FNV-1a over the three coordinates
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for v in [p.0, p.1, p.2] {
        for byte in v.to_le_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    h
}

fn lookup_cell(p: Vec3) -> (i32, i32) {
    (
        (p.x / LOOKUP_CELL).floor() as i32,
        (p.z / LOOKUP_CELL).floor() as i32,
    )
}

/// Closest point on triangle `abc` to `p` (Ericson, Real-Time Collision
/// Detection, 5.1.5)
fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
