//! Behavior finite state machine
//!
//! A closed set of states drives each agent. Exactly one state is current;
//! a transition runs `exit(old)` to completion before `enter(new)` starts.
//! When several triggers fire in the same tick only the highest-priority
//! one wins (Chase over Flee over Investigate over Patrol over Idle over
//! Explore), so rapid re-entrant triggering still resolves to a single
//! transition.

use drift_core::EntityId;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Behavior tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Base seconds spent in Idle before patrolling (shortened by alert)
    pub idle_duration: f32,
    /// Alert level at which a remembered position triggers Investigate
    pub investigate_alert: f32,
    /// Radius of the generated patrol loop around the spawn point
    pub patrol_radius: f32,
    /// Waypoints in the generated patrol loop
    pub patrol_points: usize,
    /// Seconds without progress before a patrol waypoint is skipped
    pub waypoint_timeout: f32,
    /// Arrival distance for behavior-level waypoints
    pub arrival_radius: f32,
    /// Seconds before Investigate gives up
    pub investigate_timeout: f32,
    /// Chance that Investigate exits into Patrol rather than Explore
    pub investigate_patrol_weight: f32,
    /// Seconds of lost sight before Chase gives up
    pub lost_sight_duration: f32,
    /// Hard cap on one chase
    pub max_chase_duration: f32,
    /// Chase gives up beyond this distance from the target
    pub give_up_radius: f32,
    /// Speed multiplier while fleeing
    pub flee_speed_multiplier: f32,
    /// Flee ends once this far from the threat
    pub flee_safe_radius: f32,
    /// Hard cap on one flee
    pub max_flee_duration: f32,
    /// Distance of each successive Explore target
    pub explore_radius: f32,
    /// Seconds before Explore gives up
    pub explore_timeout: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            idle_duration: 4.0,
            investigate_alert: 0.4,
            patrol_radius: 12.0,
            patrol_points: 4,
            waypoint_timeout: 6.0,
            arrival_radius: 1.5,
            investigate_timeout: 8.0,
            investigate_patrol_weight: 0.7,
            lost_sight_duration: 3.0,
            max_chase_duration: 20.0,
            give_up_radius: 40.0,
            flee_speed_multiplier: 1.6,
            flee_safe_radius: 30.0,
            max_flee_duration: 10.0,
            explore_radius: 20.0,
            explore_timeout: 15.0,
        }
    }
}

/// Discriminant of a behavior state, for priority ranking and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorKind {
    Idle,
    Patrol,
    Investigate,
    Chase,
    Flee,
    Explore,
}

impl BehaviorKind {
    /// Rank used to resolve simultaneous triggers; higher wins
    fn priority(self) -> u8 {
        match self {
            BehaviorKind::Chase => 5,
            BehaviorKind::Flee => 4,
            BehaviorKind::Investigate => 3,
            BehaviorKind::Patrol => 2,
            BehaviorKind::Idle => 1,
            BehaviorKind::Explore => 0,
        }
    }
}

impl std::fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BehaviorKind::Idle => "Idle",
            BehaviorKind::Patrol => "Patrol",
            BehaviorKind::Investigate => "Investigate",
            BehaviorKind::Chase => "Chase",
            BehaviorKind::Flee => "Flee",
            BehaviorKind::Explore => "Explore",
        };
        f.write_str(name)
    }
}

/// Current behavior state with its per-state data
#[derive(Debug, Clone)]
pub enum BehaviorState {
    Idle {
        elapsed: f32,
    },
    Patrol {
        waypoints: Vec<Vec3>,
        current: usize,
        stall: f32,
        last_distance: f32,
    },
    Investigate {
        target: Vec3,
        elapsed: f32,
    },
    Chase {
        target: EntityId,
        last_seen: Vec3,
        lost_for: f32,
        elapsed: f32,
    },
    Flee {
        threat: Vec3,
        elapsed: f32,
    },
    Explore {
        target: Vec3,
        elapsed: f32,
    },
}

impl BehaviorState {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            BehaviorState::Idle { .. } => BehaviorKind::Idle,
            BehaviorState::Patrol { .. } => BehaviorKind::Patrol,
            BehaviorState::Investigate { .. } => BehaviorKind::Investigate,
            BehaviorState::Chase { .. } => BehaviorKind::Chase,
            BehaviorState::Flee { .. } => BehaviorKind::Flee,
            BehaviorState::Explore { .. } => BehaviorKind::Explore,
        }
    }
}

/// What the machine saw this tick, assembled by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorContext {
    pub position: Vec3,
    pub spawn_position: Vec3,
    /// Closest visible non-agent-controlled entity, if any
    pub visible_target: Option<(EntityId, Vec3)>,
    /// Current sighting of the entity an active chase tracks, if visible.
    /// Distinct from `visible_target` because the chased entity may not be
    /// the closest one.
    pub target_sighting: Option<(EntityId, Vec3)>,
    /// Current alert level, `[0, 1]`
    pub alert: f32,
    /// Best remembered position worth investigating
    pub point_of_interest: Option<Vec3>,
    /// An active threat to run from, if any
    pub threat: Option<Vec3>,
}

/// What the agent should do next, consumed by movement/navigation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorCommand {
    /// Where to head, or `None` to hold position
    pub destination: Option<Vec3>,
    /// Multiplier on the agent's base max speed
    pub speed_multiplier: f32,
}

impl BehaviorCommand {
    fn hold() -> Self {
        Self {
            destination: None,
            speed_multiplier: 1.0,
        }
    }

    fn move_to(destination: Vec3) -> Self {
        Self {
            destination: Some(destination),
            speed_multiplier: 1.0,
        }
    }
}

/// Per-agent finite state machine over [`BehaviorState`]
#[derive(Debug, Clone)]
pub struct BehaviorMachine {
    config: BehaviorConfig,
    state: BehaviorState,
    previous: Option<BehaviorKind>,
    speed_multiplier: f32,
    transition_count: u64,
}

impl BehaviorMachine {
    /// Idle machine, the spawn default
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            state: BehaviorState::Idle { elapsed: 0.0 },
            previous: None,
            speed_multiplier: 1.0,
            transition_count: 0,
        }
    }

    /// Machine that starts patrolling immediately
    pub fn new_patrolling<R: Rng>(config: BehaviorConfig, spawn: Vec3, rng: &mut R) -> Self {
        let mut machine = Self::new(config);
        let waypoints = machine.generate_patrol_loop(spawn, rng);
        machine.apply_transition(BehaviorState::Patrol {
            waypoints,
            current: 0,
            stall: 0.0,
            last_distance: f32::MAX,
        });
        machine
    }

    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    pub fn kind(&self) -> BehaviorKind {
        self.state.kind()
    }

    pub fn previous_kind(&self) -> Option<BehaviorKind> {
        self.previous
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Multiplier the active state imposes on movement speed
    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Advance the machine one tick.
    ///
    /// Runs the current state, gathers every transition whose trigger fired,
    /// applies the single highest-priority one, and reports the movement
    /// command for this tick.
    pub fn update<R: Rng>(
        &mut self,
        ctx: &BehaviorContext,
        delta_time: f32,
        rng: &mut R,
    ) -> BehaviorCommand {
        let mut candidates: Vec<BehaviorState> = Vec::new();

        // A threat can interrupt any state except an active chase decision;
        // priority ranking sorts that out below.
        if let Some(threat) = ctx.threat {
            if self.kind() != BehaviorKind::Flee {
                candidates.push(BehaviorState::Flee {
                    threat,
                    elapsed: 0.0,
                });
            }
        }

        let command = match &mut self.state {
            BehaviorState::Idle { elapsed } => {
                *elapsed += delta_time;

                if let Some((target, position)) = ctx.visible_target {
                    candidates.push(BehaviorState::Chase {
                        target,
                        last_seen: position,
                        lost_for: 0.0,
                        elapsed: 0.0,
                    });
                } else if ctx.alert >= self.config.investigate_alert {
                    if let Some(poi) = ctx.point_of_interest {
                        candidates.push(BehaviorState::Investigate {
                            target: poi,
                            elapsed: 0.0,
                        });
                    }
                }

                // Alert shortens the wait
                let wait = self.config.idle_duration * (1.0 - ctx.alert).max(0.25);
                if *elapsed >= wait {
                    let waypoints = generate_patrol_loop(
                        ctx.spawn_position,
                        self.config.patrol_radius,
                        self.config.patrol_points,
                        rng,
                    );
                    candidates.push(BehaviorState::Patrol {
                        waypoints,
                        current: 0,
                        stall: 0.0,
                        last_distance: f32::MAX,
                    });
                }

                BehaviorCommand::hold()
            }

            BehaviorState::Patrol {
                waypoints,
                current,
                stall,
                last_distance,
            } => {
                if let Some((target, position)) = ctx.visible_target {
                    candidates.push(BehaviorState::Chase {
                        target,
                        last_seen: position,
                        lost_for: 0.0,
                        elapsed: 0.0,
                    });
                } else if ctx.alert >= self.config.investigate_alert {
                    if let Some(poi) = ctx.point_of_interest {
                        candidates.push(BehaviorState::Investigate {
                            target: poi,
                            elapsed: 0.0,
                        });
                    }
                }

                if waypoints.is_empty() {
                    BehaviorCommand::hold()
                } else {
                    let waypoint = waypoints[*current];
                    let distance = ctx.position.distance(waypoint);

                    if distance <= self.config.arrival_radius {
                        *current = (*current + 1) % waypoints.len();
                        *stall = 0.0;
                        *last_distance = f32::MAX;
                    } else if distance + 0.01 < *last_distance {
                        *last_distance = distance;
                        *stall = 0.0;
                    } else {
                        // No progress; skip the waypoint instead of stalling
                        *stall += delta_time;
                        if *stall >= self.config.waypoint_timeout {
                            log::debug!("Patrol waypoint {} timed out, skipping", *current);
                            *current = (*current + 1) % waypoints.len();
                            *stall = 0.0;
                            *last_distance = f32::MAX;
                        }
                    }

                    BehaviorCommand::move_to(waypoints[*current])
                }
            }

            BehaviorState::Investigate { target, elapsed } => {
                *elapsed += delta_time;

                if let Some((entity, position)) = ctx.visible_target {
                    candidates.push(BehaviorState::Chase {
                        target: entity,
                        last_seen: position,
                        lost_for: 0.0,
                        elapsed: 0.0,
                    });
                }

                let arrived = ctx.position.distance(*target) <= self.config.arrival_radius;
                if arrived || *elapsed >= self.config.investigate_timeout {
                    if rng.gen::<f32>() < self.config.investigate_patrol_weight {
                        let waypoints = generate_patrol_loop(
                            ctx.spawn_position,
                            self.config.patrol_radius,
                            self.config.patrol_points,
                            rng,
                        );
                        candidates.push(BehaviorState::Patrol {
                            waypoints,
                            current: 0,
                            stall: 0.0,
                            last_distance: f32::MAX,
                        });
                    } else {
                        candidates.push(BehaviorState::Explore {
                            target: random_target(ctx.position, self.config.explore_radius, rng),
                            elapsed: 0.0,
                        });
                    }
                }

                BehaviorCommand::move_to(*target)
            }

            BehaviorState::Chase {
                target,
                last_seen,
                lost_for,
                elapsed,
            } => {
                *elapsed += delta_time;

                let still_visible = ctx
                    .target_sighting
                    .or(ctx.visible_target)
                    .filter(|(entity, _)| entity == target)
                    .map(|(_, position)| position);
                match still_visible {
                    Some(position) => {
                        *last_seen = position;
                        *lost_for = 0.0;
                    }
                    None => *lost_for += delta_time,
                }

                let out_of_reach = ctx.position.distance(*last_seen) > self.config.give_up_radius;
                let gave_up = *lost_for >= self.config.lost_sight_duration
                    || *elapsed >= self.config.max_chase_duration
                    || out_of_reach;
                if gave_up {
                    candidates.push(BehaviorState::Investigate {
                        target: *last_seen,
                        elapsed: 0.0,
                    });
                } else {
                    // The ongoing chase competes as a candidate so it
                    // outranks a simultaneous threat
                    candidates.push(BehaviorState::Chase {
                        target: *target,
                        last_seen: *last_seen,
                        lost_for: *lost_for,
                        elapsed: *elapsed,
                    });
                }

                BehaviorCommand::move_to(*last_seen)
            }

            BehaviorState::Flee { threat, elapsed } => {
                *elapsed += delta_time;

                let away = ctx.position - *threat;
                let safe = away.length() >= self.config.flee_safe_radius
                    || *elapsed >= self.config.max_flee_duration;
                if safe {
                    if rng.gen::<f32>() < 0.5 {
                        let waypoints = generate_patrol_loop(
                            ctx.spawn_position,
                            self.config.patrol_radius,
                            self.config.patrol_points,
                            rng,
                        );
                        candidates.push(BehaviorState::Patrol {
                            waypoints,
                            current: 0,
                            stall: 0.0,
                            last_distance: f32::MAX,
                        });
                    } else {
                        candidates.push(BehaviorState::Idle { elapsed: 0.0 });
                    }
                }

                let direction = away.normalize_or_zero();
                let fallback = Vec3::new(1.0, 0.0, 0.0);
                let step = if direction == Vec3::ZERO { fallback } else { direction };
                BehaviorCommand {
                    destination: Some(ctx.position + step * self.config.flee_safe_radius),
                    speed_multiplier: self.speed_multiplier,
                }
            }

            BehaviorState::Explore { target, elapsed } => {
                *elapsed += delta_time;

                if let Some((entity, position)) = ctx.visible_target {
                    candidates.push(BehaviorState::Chase {
                        target: entity,
                        last_seen: position,
                        lost_for: 0.0,
                        elapsed: 0.0,
                    });
                }

                if ctx.position.distance(*target) <= self.config.arrival_radius {
                    // Sequentially-changing targets, no transition needed
                    *target = random_target(ctx.position, self.config.explore_radius, rng);
                } else if *elapsed >= self.config.explore_timeout {
                    if rng.gen::<f32>() < 0.5 {
                        let waypoints = generate_patrol_loop(
                            ctx.spawn_position,
                            self.config.patrol_radius,
                            self.config.patrol_points,
                            rng,
                        );
                        candidates.push(BehaviorState::Patrol {
                            waypoints,
                            current: 0,
                            stall: 0.0,
                            last_distance: f32::MAX,
                        });
                    } else {
                        candidates.push(BehaviorState::Idle { elapsed: 0.0 });
                    }
                }

                BehaviorCommand::move_to(*target)
            }
        };

        if let Some(next) = candidates
            .into_iter()
            .max_by_key(|state| state.kind().priority())
        {
            if next.kind() != self.kind() {
                self.apply_transition(next);
            }
        }

        BehaviorCommand {
            speed_multiplier: self.speed_multiplier,
            ..command
        }
    }

    /// Force the machine into a state, running the exit/enter hooks
    pub fn force_transition(&mut self, next: BehaviorState) {
        self.apply_transition(next);
    }

    fn apply_transition(&mut self, next: BehaviorState) {
        let old = self.kind();
        self.exit_current();
        self.previous = Some(old);
        self.state = next;
        self.enter_current();
        self.transition_count += 1;
        log::debug!("Behavior transition {} -> {}", old, self.kind());
    }

    /// Exit hook; must complete before the next state's enter hook runs
    fn exit_current(&mut self) {
        if let BehaviorState::Flee { .. } = self.state {
            // Baseline speed is restored whenever a flee ends
            self.speed_multiplier = 1.0;
        }
    }

    fn enter_current(&mut self) {
        if let BehaviorState::Flee { .. } = self.state {
            self.speed_multiplier = self.config.flee_speed_multiplier;
        }
    }

    fn generate_patrol_loop<R: Rng>(&self, spawn: Vec3, rng: &mut R) -> Vec<Vec3> {
        generate_patrol_loop(spawn, self.config.patrol_radius, self.config.patrol_points, rng)
    }
}

/// Closed loop of waypoints on a jittered circle around `center`
fn generate_patrol_loop<R: Rng>(center: Vec3, radius: f32, points: usize, rng: &mut R) -> Vec<Vec3> {
    let count = points.max(2);
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            let r = radius * rng.gen_range(0.6..1.0);
            center + Vec3::new(angle.cos() * r, 0.0, angle.sin() * r)
        })
        .collect()
}

fn random_target<R: Rng>(from: Vec3, radius: f32, rng: &mut R) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    from + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn ctx() -> BehaviorContext {
        BehaviorContext::default()
    }

    #[test]
    fn test_starts_idle() {
        let machine = BehaviorMachine::new(BehaviorConfig::default());
        assert_eq!(machine.kind(), BehaviorKind::Idle);
        assert_eq!(machine.transition_count(), 0);
    }

    #[test]
    fn test_idle_times_out_into_patrol() {
        let mut machine = BehaviorMachine::new(BehaviorConfig::default());
        let mut rng = rng();

        let command = machine.update(&ctx(), 5.0, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Patrol);
        // The transition takes effect this tick; movement starts next tick
        assert!(command.destination.is_none());

        let command = machine.update(&ctx(), 0.1, &mut rng);
        assert!(command.destination.is_some());
    }

    #[test]
    fn test_alert_shortens_idle() {
        let config = BehaviorConfig::default();
        let mut rng = rng();

        let mut calm = BehaviorMachine::new(config);
        let mut alarmed = BehaviorMachine::new(config);

        let alarmed_ctx = BehaviorContext {
            alert: 0.9,
            ..ctx()
        };

        // Long enough for an alarmed agent, not for a calm one
        calm.update(&ctx(), 1.5, &mut rng);
        alarmed.update(&alarmed_ctx, 1.5, &mut rng);

        assert_eq!(calm.kind(), BehaviorKind::Idle);
        assert_eq!(alarmed.kind(), BehaviorKind::Patrol);
    }

    #[test]
    fn test_sighting_in_patrol_triggers_chase() {
        let mut rng = rng();
        let mut machine =
            BehaviorMachine::new_patrolling(BehaviorConfig::default(), Vec3::ZERO, &mut rng);

        let sighted = BehaviorContext {
            visible_target: Some((EntityId(9), Vec3::new(5.0, 0.0, 5.0))),
            ..ctx()
        };
        machine.update(&sighted, 0.1, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Chase);

        // Next tick the command aims at the sighted position
        let command = machine.update(&sighted, 0.1, &mut rng);
        assert_eq!(command.destination, Some(Vec3::new(5.0, 0.0, 5.0)));
    }

    #[test]
    fn test_chase_gives_up_into_investigate() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        machine.force_transition(BehaviorState::Chase {
            target: EntityId(9),
            last_seen: Vec3::new(10.0, 0.0, 0.0),
            lost_for: 0.0,
            elapsed: 0.0,
        });

        // Target never reappears
        machine.update(&ctx(), config.lost_sight_duration + 1.0, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Investigate);
        match machine.state() {
            BehaviorState::Investigate { target, .. } => {
                assert_eq!(*target, Vec3::new(10.0, 0.0, 0.0));
            }
            other => panic!("expected Investigate, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_chase_gives_up_beyond_radius() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        machine.force_transition(BehaviorState::Chase {
            target: EntityId(9),
            last_seen: Vec3::new(1000.0, 0.0, 0.0),
            lost_for: 0.0,
            elapsed: 0.0,
        });

        machine.update(&ctx(), 0.1, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Investigate);
    }

    #[test]
    fn test_simultaneous_triggers_resolve_to_chase() {
        // A sighting and a threat land in the same tick; Chase outranks Flee
        let mut rng = rng();
        let mut machine =
            BehaviorMachine::new_patrolling(BehaviorConfig::default(), Vec3::ZERO, &mut rng);

        let both = BehaviorContext {
            visible_target: Some((EntityId(9), Vec3::new(5.0, 0.0, 0.0))),
            threat: Some(Vec3::new(-5.0, 0.0, 0.0)),
            ..ctx()
        };
        machine.update(&both, 0.1, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Chase);
        assert_eq!(machine.transition_count(), 2); // spawn patrol + chase
    }

    #[test]
    fn test_threat_does_not_interrupt_active_chase() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        machine.force_transition(BehaviorState::Chase {
            target: EntityId(9),
            last_seen: Vec3::new(5.0, 0.0, 0.0),
            lost_for: 0.0,
            elapsed: 0.0,
        });

        // Threat lands mid-chase while the target is still in sight
        let contested = BehaviorContext {
            visible_target: Some((EntityId(9), Vec3::new(5.0, 0.0, 0.0))),
            threat: Some(Vec3::new(-2.0, 0.0, 0.0)),
            ..ctx()
        };
        machine.update(&contested, 0.1, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Chase);

        // Once the chase gives up, a still-present threat wins the tick
        let threat_only = BehaviorContext {
            threat: Some(Vec3::new(-2.0, 0.0, 0.0)),
            ..ctx()
        };
        machine.update(&threat_only, config.lost_sight_duration + 1.0, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Flee);
    }

    #[test]
    fn test_chase_tracks_target_past_closer_entity() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        machine.force_transition(BehaviorState::Chase {
            target: EntityId(9),
            last_seen: Vec3::new(10.0, 0.0, 0.0),
            lost_for: 0.0,
            elapsed: 0.0,
        });

        // Another entity is closer, but the chased one is still in view
        let crowded = BehaviorContext {
            visible_target: Some((EntityId(3), Vec3::new(2.0, 0.0, 0.0))),
            target_sighting: Some((EntityId(9), Vec3::new(11.0, 0.0, 0.0))),
            ..ctx()
        };
        let ticks = (config.lost_sight_duration / 0.5) as usize + 2;
        for _ in 0..ticks {
            machine.update(&crowded, 0.5, &mut rng);
        }

        assert_eq!(machine.kind(), BehaviorKind::Chase);
        match machine.state() {
            BehaviorState::Chase {
                last_seen,
                lost_for,
                ..
            } => {
                assert_eq!(*last_seen, Vec3::new(11.0, 0.0, 0.0));
                assert_eq!(*lost_for, 0.0);
            }
            other => panic!("expected Chase, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_flee_speed_restored_on_exit() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);

        let threatened = BehaviorContext {
            threat: Some(Vec3::new(1.0, 0.0, 0.0)),
            ..ctx()
        };
        machine.update(&threatened, 0.1, &mut rng);
        assert_eq!(machine.kind(), BehaviorKind::Flee);
        assert!(machine.speed_multiplier() > 1.0);

        // Far past the flee duration cap, threat gone
        machine.update(&ctx(), config.max_flee_duration + 1.0, &mut rng);
        assert_ne!(machine.kind(), BehaviorKind::Flee);
        assert_eq!(machine.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_flee_moves_away_from_threat() {
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(BehaviorConfig::default());
        let threat = Vec3::new(10.0, 0.0, 0.0);
        machine.force_transition(BehaviorState::Flee {
            threat,
            elapsed: 0.0,
        });

        let here = BehaviorContext {
            position: Vec3::ZERO,
            ..ctx()
        };
        let command = machine.update(&here, 0.1, &mut rng);
        let destination = command.destination.unwrap();
        assert!(destination.x < 0.0); // away from +x threat
        assert!(command.speed_multiplier > 1.0);
    }

    #[test]
    fn test_investigate_exits_to_patrol_or_explore() {
        let config = BehaviorConfig::default();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut machine = BehaviorMachine::new(config);
            machine.force_transition(BehaviorState::Investigate {
                target: Vec3::ZERO,
                elapsed: 0.0,
            });

            // Already at the target, so the investigate resolves at once
            machine.update(&ctx(), 0.1, &mut rng);
            assert!(
                machine.kind() == BehaviorKind::Patrol || machine.kind() == BehaviorKind::Explore,
                "unexpected exit state {:?}",
                machine.kind()
            );
        }
    }

    #[test]
    fn test_patrol_waypoint_stall_forces_advance() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        machine.force_transition(BehaviorState::Patrol {
            waypoints: vec![Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 100.0)],
            current: 0,
            stall: 0.0,
            last_distance: f32::MAX,
        });

        // Agent pinned in place; first update records the distance,
        // later ones accumulate stall past the timeout
        let pinned = BehaviorContext {
            position: Vec3::ZERO,
            ..ctx()
        };
        machine.update(&pinned, 0.1, &mut rng);
        let command = machine.update(&pinned, config.waypoint_timeout + 1.0, &mut rng);

        assert_eq!(command.destination, Some(Vec3::new(0.0, 0.0, 100.0)));
        assert_eq!(machine.kind(), BehaviorKind::Patrol);
    }

    #[test]
    fn test_explore_advances_target_on_arrival() {
        let config = BehaviorConfig::default();
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(config);
        let first_target = Vec3::new(0.5, 0.0, 0.5);
        machine.force_transition(BehaviorState::Explore {
            target: first_target,
            elapsed: 0.0,
        });

        let at_target = BehaviorContext {
            position: first_target,
            ..ctx()
        };
        let command = machine.update(&at_target, 0.1, &mut rng);

        // Still exploring, toward a new target
        assert_eq!(machine.kind(), BehaviorKind::Explore);
        assert_ne!(command.destination, Some(first_target));
    }

    #[test]
    fn test_single_transition_per_tick() {
        let mut rng = rng();
        let mut machine = BehaviorMachine::new(BehaviorConfig::default());

        // Everything fires at once from Idle
        let chaos = BehaviorContext {
            visible_target: Some((EntityId(1), Vec3::new(5.0, 0.0, 0.0))),
            threat: Some(Vec3::new(-5.0, 0.0, 0.0)),
            alert: 1.0,
            point_of_interest: Some(Vec3::new(0.0, 0.0, 5.0)),
            ..ctx()
        };
        let before = machine.transition_count();
        machine.update(&chaos, 10.0, &mut rng);
        assert_eq!(machine.transition_count(), before + 1);
        assert_eq!(machine.kind(), BehaviorKind::Chase);
    }
}
