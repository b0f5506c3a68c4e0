//! Vision, sighting memory and alert level

use drift_core::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Perception tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerceptionConfig {
    /// Maximum sighting distance
    pub range: f32,
    /// Full field-of-view angle, degrees
    pub fov_degrees: f32,
    /// Seconds a record survives after the entity was last seen
    pub memory_duration: f32,
    /// Alert lost per second with no fresh input
    pub alert_decay_rate: f32,
    /// Alert gained by a fresh sighting
    pub sighting_alert: f32,
    /// Alert gained by an external disturbance
    pub disturbance_alert: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            range: 25.0,
            fov_degrees: 120.0,
            memory_duration: 10.0,
            alert_decay_rate: 0.1,
            sighting_alert: 0.5,
            disturbance_alert: 0.35,
        }
    }
}

impl PerceptionConfig {
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_fov_degrees(mut self, degrees: f32) -> Self {
        self.fov_degrees = degrees;
        self
    }
}

/// Memory of one observed entity
#[derive(Debug, Clone, Copy)]
pub struct PerceptionRecord {
    /// Where the entity was when last seen
    pub last_known_position: Vec3,
    /// Simulation time of the last sighting
    pub last_seen: f64,
    /// Whether the entity was visible in the latest update
    pub visible: bool,
}

/// Per-agent sensing state.
///
/// Alert level is a single scalar in `[0, 1]`: fresh sightings and
/// disturbances raise it, [`decay`](Self::decay) lowers it.
#[derive(Debug, Clone, Default)]
pub struct PerceptionModel {
    config: PerceptionConfig,
    records: HashMap<EntityId, PerceptionRecord>,
    alert: f32,
    /// Latest disturbance position, kept until investigated or decayed
    disturbance: Option<Vec3>,
}

impl PerceptionModel {
    pub fn new(config: PerceptionConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            alert: 0.0,
            disturbance: None,
        }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Current alert level, clamped to `[0, 1]`
    pub fn alert(&self) -> f32 {
        self.alert
    }

    /// Re-evaluate which candidates are visible.
    ///
    /// A candidate is visible when it is within range, within half the
    /// field of view of `facing`, and `occluded` reports a clear line from
    /// `self_position` to it. Records for visible entities are refreshed;
    /// records for entities that dropped out keep their last known
    /// position with `visible` cleared.
    pub fn update_visibility<F>(
        &mut self,
        candidates: &[(EntityId, Vec3)],
        self_position: Vec3,
        facing: Vec3,
        now: f64,
        occluded: F,
    ) where
        F: Fn(Vec3, Vec3) -> bool,
    {
        for record in self.records.values_mut() {
            record.visible = false;
        }

        let half_fov = (self.config.fov_degrees * 0.5).to_radians();
        let forward = facing.normalize_or_zero();

        for &(entity, position) in candidates {
            let offset = position - self_position;
            let distance = offset.length();
            if distance > self.config.range {
                continue;
            }
            if forward != Vec3::ZERO && distance > f32::EPSILON {
                let angle = forward.angle_between(offset / distance);
                if angle > half_fov {
                    continue;
                }
            }
            if occluded(self_position, position) {
                continue;
            }

            let fresh = !self
                .records
                .get(&entity)
                .map(|r| r.visible || now - r.last_seen < 0.5)
                .unwrap_or(false);
            self.records.insert(
                entity,
                PerceptionRecord {
                    last_known_position: position,
                    last_seen: now,
                    visible: true,
                },
            );
            if fresh {
                self.raise_alert(self.config.sighting_alert);
            }
        }
    }

    /// Age out stale records and bleed off alert
    pub fn decay(&mut self, delta_time: f32, now: f64) {
        let memory = self.config.memory_duration as f64;
        self.records
            .retain(|_, r| r.visible || now - r.last_seen <= memory);

        self.alert = (self.alert - self.config.alert_decay_rate * delta_time).max(0.0);
        if self.alert <= f32::EPSILON {
            self.disturbance = None;
        }
    }

    /// Record an external disturbance (a noise, an impact) at a position.
    /// `strength` scales the alert gain; 1.0 is a typical nearby noise.
    pub fn notice_disturbance(&mut self, position: Vec3, strength: f32) {
        self.disturbance = Some(position);
        self.raise_alert(self.config.disturbance_alert * strength.max(0.0));
    }

    pub fn last_known_position(&self, entity: EntityId) -> Option<Vec3> {
        self.records.get(&entity).map(|r| r.last_known_position)
    }

    pub fn record(&self, entity: EntityId) -> Option<&PerceptionRecord> {
        self.records.get(&entity)
    }

    /// The visible entity most recently sighted, if any
    pub fn best_visible(&self) -> Option<(EntityId, Vec3)> {
        self.records
            .iter()
            .filter(|(_, r)| r.visible)
            .max_by(|a, b| {
                a.1.last_seen
                    .partial_cmp(&b.1.last_seen)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(&entity, r)| (entity, r.last_known_position))
    }

    pub fn has_visible(&self) -> bool {
        self.records.values().any(|r| r.visible)
    }

    /// The most promising place to investigate: the latest disturbance, or
    /// failing that the most recent non-visible sighting
    pub fn point_of_interest(&self) -> Option<Vec3> {
        if let Some(position) = self.disturbance {
            return Some(position);
        }
        self.records
            .values()
            .filter(|r| !r.visible)
            .max_by(|a, b| {
                a.last_seen
                    .partial_cmp(&b.last_seen)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.last_known_position)
    }

    /// Drop everything tracked about one entity
    pub fn forget(&mut self, entity: EntityId) {
        self.records.remove(&entity);
    }

    fn raise_alert(&mut self, amount: f32) {
        self.alert = (self.alert + amount).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn never_occluded(_: Vec3, _: Vec3) -> bool {
        false
    }

    #[test]
    fn test_visibility_range_and_fov() {
        let mut perception = PerceptionModel::new(
            PerceptionConfig::default()
                .with_range(20.0)
                .with_fov_degrees(90.0),
        );

        let candidates = vec![
            (EntityId(1), Vec3::new(0.0, 0.0, 10.0)),  // ahead, in range
            (EntityId(2), Vec3::new(0.0, 0.0, 50.0)),  // ahead, too far
            (EntityId(3), Vec3::new(0.0, 0.0, -10.0)), // behind
        ];
        perception.update_visibility(&candidates, Vec3::ZERO, Vec3::Z, 0.0, never_occluded);

        assert!(perception.record(EntityId(1)).is_some_and(|r| r.visible));
        assert!(perception.record(EntityId(2)).is_none());
        assert!(perception.record(EntityId(3)).is_none());
    }

    #[test]
    fn test_occlusion_blocks_sighting() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        let candidates = vec![(EntityId(1), Vec3::new(0.0, 0.0, 10.0))];

        perception.update_visibility(&candidates, Vec3::ZERO, Vec3::Z, 0.0, |_, _| true);
        assert!(!perception.has_visible());
        assert_relative_eq!(perception.alert(), 0.0);
    }

    #[test]
    fn test_sighting_raises_and_clamps_alert() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        let candidates = vec![
            (EntityId(1), Vec3::new(0.0, 0.0, 5.0)),
            (EntityId(2), Vec3::new(1.0, 0.0, 5.0)),
            (EntityId(3), Vec3::new(2.0, 0.0, 5.0)),
        ];
        perception.update_visibility(&candidates, Vec3::ZERO, Vec3::Z, 0.0, never_occluded);

        assert!(perception.alert() > 0.0);
        assert!(perception.alert() <= 1.0);
    }

    #[test]
    fn test_lost_entity_keeps_last_known_position() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        let seen_at = Vec3::new(0.0, 0.0, 8.0);
        perception.update_visibility(&[(EntityId(7), seen_at)], Vec3::ZERO, Vec3::Z, 0.0, never_occluded);

        // Next update the entity is gone
        perception.update_visibility(&[], Vec3::ZERO, Vec3::Z, 1.0, never_occluded);

        let record = perception.record(EntityId(7)).unwrap();
        assert!(!record.visible);
        assert_eq!(perception.last_known_position(EntityId(7)), Some(seen_at));
    }

    #[test]
    fn test_decay_ages_out_records_and_alert() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        perception.update_visibility(
            &[(EntityId(1), Vec3::new(0.0, 0.0, 5.0))],
            Vec3::ZERO,
            Vec3::Z,
            0.0,
            never_occluded,
        );
        perception.update_visibility(&[], Vec3::ZERO, Vec3::Z, 1.0, never_occluded);

        let alert_before = perception.alert();
        perception.decay(2.0, 2.0);
        assert!(perception.alert() < alert_before);
        assert!(perception.record(EntityId(1)).is_some());

        // Far past the memory window
        perception.decay(0.1, 100.0);
        assert!(perception.record(EntityId(1)).is_none());
    }

    #[test]
    fn test_disturbance_becomes_point_of_interest() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        let bang = Vec3::new(12.0, 0.0, -3.0);
        perception.notice_disturbance(bang, 1.0);

        assert!(perception.alert() > 0.0);
        assert_eq!(perception.point_of_interest(), Some(bang));
    }

    #[test]
    fn test_disturbance_strength_scales_alert() {
        let config = PerceptionConfig::default();

        let mut faint = PerceptionModel::new(config);
        faint.notice_disturbance(Vec3::ZERO, 0.5);

        let mut loud = PerceptionModel::new(config);
        loud.notice_disturbance(Vec3::ZERO, 2.0);

        assert!(faint.alert() < loud.alert());
        assert_eq!(faint.alert(), config.disturbance_alert * 0.5);
        assert!(loud.alert() <= 1.0);
    }

    #[test]
    fn test_best_visible_prefers_latest_sighting() {
        let mut perception = PerceptionModel::new(PerceptionConfig::default());
        perception.update_visibility(
            &[(EntityId(1), Vec3::new(0.0, 0.0, 5.0))],
            Vec3::ZERO,
            Vec3::Z,
            0.0,
            never_occluded,
        );
        perception.update_visibility(
            &[
                (EntityId(1), Vec3::new(0.0, 0.0, 5.0)),
                (EntityId(2), Vec3::new(1.0, 0.0, 5.0)),
            ],
            Vec3::ZERO,
            Vec3::Z,
            1.0,
            never_occluded,
        );

        // Both visible at the same timestamp; either is acceptable, but
        // the result must be one of the visible set
        let (entity, _) = perception.best_visible().unwrap();
        assert!(entity == EntityId(1) || entity == EntityId(2));
    }
}
