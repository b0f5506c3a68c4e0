//! Path data
//!
//! An agent holds at most one active path. The waypoint index only ever
//! moves forward; replacing a path swaps the whole value, never part of it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An ordered sequence of waypoints across the navigation mesh
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NavPath {
    /// Waypoints in world space
    waypoints: Vec<Vec3>,
    /// Index of the waypoint currently being approached
    current_index: usize,
}

impl NavPath {
    /// Create a path from waypoints
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self {
            waypoints,
            current_index: 0,
        }
    }

    /// Whether the path has no waypoints at all
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Whether every waypoint has been reached
    pub fn is_complete(&self) -> bool {
        self.current_index >= self.waypoints.len()
    }

    /// The waypoint currently being approached
    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.waypoints.get(self.current_index).copied()
    }

    /// The final destination
    pub fn destination(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    /// Current waypoint index
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Total number of waypoints
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Advance to the next waypoint (index is non-decreasing)
    pub fn advance(&mut self) {
        if self.current_index < self.waypoints.len() {
            self.current_index += 1;
        }
    }

    /// Remaining distance along the path from the current waypoint on
    pub fn remaining_distance(&self, from: Vec3) -> f32 {
        let Some(first) = self.current_waypoint() else {
            return 0.0;
        };
        let mut distance = from.distance(first);
        for pair in self.waypoints[self.current_index..].windows(2) {
            distance += pair[0].distance(pair[1]);
        }
        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> NavPath {
        NavPath::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn test_index_is_monotonic() {
        let mut path = path3();
        let mut last = path.current_index();
        for _ in 0..10 {
            path.advance();
            assert!(path.current_index() >= last);
            last = path.current_index();
        }
        assert!(path.is_complete());
        // Advancing past the end stays clamped
        assert_eq!(path.current_index(), 3);
    }

    #[test]
    fn test_current_waypoint_progression() {
        let mut path = path3();
        assert_eq!(path.current_waypoint(), Some(Vec3::ZERO));
        path.advance();
        assert_eq!(path.current_waypoint(), Some(Vec3::new(5.0, 0.0, 0.0)));
        path.advance();
        path.advance();
        assert_eq!(path.current_waypoint(), None);
    }

    #[test]
    fn test_remaining_distance() {
        let mut path = path3();
        path.advance();
        let remaining = path.remaining_distance(Vec3::new(4.0, 0.0, 0.0));
        assert!((remaining - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_path() {
        let path = NavPath::default();
        assert!(path.is_empty());
        assert!(path.is_complete());
        assert_eq!(path.destination(), None);
    }
}
