//! Movement resolution
//!
//! Turns the active path into horizontal motion, keeps agents on the
//! resident terrain surface, and never commits a non-finite value. An agent
//! over a gap in the streamed world free-falls with a clamped depth until
//! geometry arrives under it.

use crate::agent::{Agent, PhysicsState};
use drift_terrain::TerrainStreamingCache;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Movement tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Downward acceleration, units per second squared
    pub gravity: f32,
    /// Distance at which a waypoint counts as reached
    pub arrival_radius: f32,
    /// Fastest allowed fall
    pub max_fall_speed: f32,
    /// Deepest fall below the last stable position before clamping
    pub max_fall_depth: f32,
    /// Height above ground within which the agent snaps down onto it
    pub ground_snap: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            arrival_radius: 0.75,
            max_fall_speed: 40.0,
            max_fall_depth: 64.0,
            ground_snap: 0.5,
        }
    }
}

/// Resolves one agent's motion per tick against resident terrain
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementResolver {
    config: MovementConfig,
}

impl MovementResolver {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Advance `agent` by `delta_time`.
    ///
    /// Path following, gravity, ground snapping and the numeric-safety
    /// substitution all happen here; the committed position and yaw are
    /// always finite.
    pub fn advance(
        &self,
        agent: &mut Agent,
        cache: &TerrainStreamingCache,
        delta_time: f32,
        speed_multiplier: f32,
    ) {
        let start = agent.position;

        // Horizontal: head for the current waypoint, if any
        let mut direction = Vec3::ZERO;
        if let Some(path) = &mut agent.path {
            while let Some(waypoint) = path.current_waypoint() {
                let offset = Vec3::new(waypoint.x - start.x, 0.0, waypoint.z - start.z);
                if offset.length() <= self.config.arrival_radius {
                    path.advance();
                    if path.is_complete() {
                        break;
                    }
                } else {
                    direction = offset.normalize_or_zero();
                    break;
                }
            }
            if path.is_complete() {
                agent.path = None;
            }
        }

        let horizontal = direction * agent.max_speed * speed_multiplier;
        let mut position = start + horizontal * delta_time;
        if direction != Vec3::ZERO {
            agent.yaw = direction.x.atan2(direction.z);
        }

        // Vertical: snap to resident ground, otherwise fall
        let mut physics = agent.physics.take().unwrap_or(PhysicsState::at(start));
        match cache.ground_height(position.x, position.z) {
            Some(ground) => {
                if position.y <= ground + self.config.ground_snap {
                    position.y = ground;
                    physics.vertical_velocity = 0.0;
                    physics.grounded = true;
                } else {
                    self.fall(&mut position, &mut physics, delta_time);
                }
            }
            None => {
                // No collision data yet; fall, but never past the clamp
                log::debug!("Agent {} has no resident geometry underfoot", agent.id);
                self.fall(&mut position, &mut physics, delta_time);
                let floor = physics.last_stable_position.y - self.config.max_fall_depth;
                if position.y < floor {
                    position.y = floor;
                    physics.vertical_velocity = 0.0;
                }
            }
        }

        // Numeric safety: a non-finite result never reaches the agent
        if !position.is_finite() || !agent.yaw.is_finite() {
            log::warn!(
                "Agent {} produced a non-finite transform, restoring last stable state",
                agent.id
            );
            position = physics.last_stable_position;
            agent.yaw = 0.0;
            physics.vertical_velocity = 0.0;
            if !position.is_finite() {
                // No stable history yet; the spawn point is the safe default
                position = agent.spawn_position;
                physics.last_stable_position = position;
            }
        }

        if physics.grounded {
            physics.last_stable_position = position;
        }

        let velocity = if delta_time > 0.0 {
            (position - start) / delta_time
        } else {
            Vec3::ZERO
        };
        agent.velocity = if velocity.is_finite() { velocity } else { Vec3::ZERO };
        agent.position = position;
        agent.physics = Some(physics);
    }

    fn fall(&self, position: &mut Vec3, physics: &mut PhysicsState, delta_time: f32) {
        physics.grounded = false;
        physics.vertical_velocity =
            (physics.vertical_velocity + self.config.gravity * delta_time).min(self.config.max_fall_speed);
        position.y -= physics.vertical_velocity * delta_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use drift_ai::{BehaviorConfig, BehaviorMachine, PerceptionConfig, PerceptionModel};
    use drift_core::AgentId;
    use drift_nav::NavPath;
    use drift_terrain::{
        ChunkKey, ChunkPayload, ScalarField, StreamingConfig, TerrainProvider,
    };

    struct AcceptAll;
    impl TerrainProvider for AcceptAll {
        fn request(&mut self, _: ChunkKey, _: i32) -> bool {
            true
        }
    }

    fn agent_at(position: Vec3) -> Agent {
        Agent {
            id: AgentId::new(0, 0),
            name: "test".into(),
            position,
            yaw: 0.0,
            velocity: Vec3::ZERO,
            max_speed: 4.0,
            mass: 70.0,
            ai_controlled: true,
            spawn_position: position,
            behavior: BehaviorMachine::new(BehaviorConfig::default()),
            perception: PerceptionModel::new(PerceptionConfig::default()),
            path: None,
            physics: None,
        }
    }

    fn flat_cache(height: f32) -> TerrainStreamingCache {
        let mut cache = TerrainStreamingCache::new(StreamingConfig::default().with_radii(0, 0));
        let mut provider = AcceptAll;
        cache.ensure_resident(AgentId::new(0, 0), Vec3::new(8.0, 5.0, 8.0), 0.0, &mut provider);
        let key = ChunkKey::new(0, 0, 0);
        cache
            .on_generated(key, ChunkPayload::Field(ScalarField::new(key, 1, vec![height; 4])), 0.0)
            .unwrap();
        cache
    }

    #[test]
    fn test_grounds_on_resident_terrain() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let cache = flat_cache(2.0);
        let mut agent = agent_at(Vec3::new(8.0, 10.0, 8.0));

        for _ in 0..100 {
            resolver.advance(&mut agent, &cache, 0.1, 1.0);
            if agent.is_grounded() {
                break;
            }
        }

        assert!(agent.is_grounded());
        assert_relative_eq!(agent.position.y, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_free_fall_is_depth_clamped() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let empty = TerrainStreamingCache::new(StreamingConfig::default());
        let mut agent = agent_at(Vec3::new(0.0, 5.0, 0.0));

        for _ in 0..1000 {
            resolver.advance(&mut agent, &empty, 0.1, 1.0);
        }

        let floor = 5.0 - MovementConfig::default().max_fall_depth;
        assert!(agent.position.y >= floor - 1e-3);
        assert!(agent.position.is_finite());
    }

    #[test]
    fn test_path_following_advances_waypoints() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let cache = flat_cache(0.0);
        let mut agent = agent_at(Vec3::new(2.0, 0.0, 8.0));
        agent.path = Some(NavPath::new(vec![
            Vec3::new(6.0, 0.0, 8.0),
            Vec3::new(12.0, 0.0, 8.0),
        ]));

        for _ in 0..200 {
            resolver.advance(&mut agent, &cache, 0.05, 1.0);
            if agent.path.is_none() {
                break;
            }
        }

        // Path exhausted and cleared at the destination
        assert!(agent.path.is_none());
        assert_relative_eq!(agent.position.x, 12.0, epsilon = 1.0);
    }

    #[test]
    fn test_yaw_faces_travel_direction() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let cache = flat_cache(0.0);
        let mut agent = agent_at(Vec3::new(2.0, 0.0, 2.0));
        agent.path = Some(NavPath::new(vec![Vec3::new(10.0, 0.0, 2.0)]));

        resolver.advance(&mut agent, &cache, 0.1, 1.0);

        // +X travel means yaw of pi/2
        assert_relative_eq!(agent.yaw, std::f32::consts::FRAC_PI_2, epsilon = 1e-3);
        assert!(agent.facing().x > 0.9);
    }

    #[test]
    fn test_speed_multiplier_scales_velocity() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let cache = flat_cache(0.0);

        let mut base = agent_at(Vec3::new(2.0, 0.0, 8.0));
        base.path = Some(NavPath::new(vec![Vec3::new(100.0, 0.0, 8.0)]));
        let mut fast = agent_at(Vec3::new(2.0, 0.0, 8.0));
        fast.path = Some(NavPath::new(vec![Vec3::new(100.0, 0.0, 8.0)]));

        resolver.advance(&mut base, &cache, 0.1, 1.0);
        resolver.advance(&mut fast, &cache, 0.1, 1.6);

        assert!(fast.position.x > base.position.x);
    }

    #[test]
    fn test_non_finite_position_is_contained() {
        let resolver = MovementResolver::new(MovementConfig::default());
        let cache = flat_cache(0.0);
        let mut agent = agent_at(Vec3::new(8.0, 0.0, 8.0));

        // Settle so a stable position is recorded
        resolver.advance(&mut agent, &cache, 0.1, 1.0);
        let stable = agent.position;

        // Corrupt the position as a fault injection
        agent.position = Vec3::new(f32::NAN, f32::NAN, f32::NAN);
        resolver.advance(&mut agent, &cache, 0.1, 1.0);

        assert!(agent.position.is_finite());
        assert_relative_eq!(agent.position.x, stable.x, epsilon = 1e-3);
    }
}
