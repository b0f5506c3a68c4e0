//! Agent orchestration
//!
//! The simulation owns every agent and runs the full per-tick pipeline in
//! stable registration order: terrain streaming refresh, perception, the
//! behavior machine, movement resolution, render-proxy sync. One agent's
//! fault is logged and skipped, never allowed to stall the tick.

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::hooks::WorldHooks;
use crate::movement::MovementResolver;
use drift_ai::{BehaviorContext, BehaviorMachine, BehaviorState, PerceptionModel};
use drift_core::{AgentId, EntityId, IdRecycler, SimClock};
use drift_nav::NavMeshService;
use drift_terrain::{ChunkSource, GeneratorPool, StreamingStats, TerrainStreamingCache};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

/// Eye height used for line-of-sight checks against terrain
const EYE_HEIGHT: f32 = 1.5;

/// A destination replacing an active path must differ by at least this much
const REPATH_DISTANCE: f32 = 1.0;

/// Owns agents and drives the whole subsystem once per tick
pub struct Simulation<H: WorldHooks> {
    config: SimConfig,
    clock: SimClock,
    /// Registration order is iteration order
    agents: Vec<Agent>,
    recycler: IdRecycler,
    cache: TerrainStreamingCache,
    pool: GeneratorPool,
    nav: NavMeshService,
    movement: MovementResolver,
    hooks: H,
    rng: StdRng,
    /// Active threats delivered by disturbances, consumed next tick
    threats: HashMap<AgentId, Vec3>,
}

impl<H: WorldHooks> Simulation<H> {
    /// Create a simulation generating terrain from `source`
    pub fn new(config: SimConfig, source: Arc<dyn ChunkSource>, hooks: H) -> Self {
        let pool = GeneratorPool::new(source, config.workers);
        Self {
            clock: SimClock::new(),
            agents: Vec::new(),
            recycler: IdRecycler::new(),
            cache: TerrainStreamingCache::new(config.streaming.clone()),
            pool,
            nav: NavMeshService::new(config.nav),
            movement: MovementResolver::new(config.movement),
            hooks,
            rng: StdRng::seed_from_u64(config.seed),
            threats: HashMap::new(),
            config,
        }
    }

    /// Spawn an agent at `position`.
    ///
    /// Fails while the host reports shared assets as not ready; the caller
    /// may retry later. AI-controlled agents start patrolling, others idle.
    pub fn spawn(&mut self, position: Vec3, ai_controlled: bool) -> Result<AgentId> {
        if !self.hooks.assets_ready() {
            return Err(SimError::ResourceUnavailable);
        }

        let id = self.recycler.allocate();
        let name = format!("agent-{}", id.index());
        let behavior = if ai_controlled {
            BehaviorMachine::new_patrolling(self.config.behavior, position, &mut self.rng)
        } else {
            BehaviorMachine::new(self.config.behavior)
        };

        self.agents.push(Agent {
            id,
            name: name.clone(),
            position,
            yaw: 0.0,
            velocity: Vec3::ZERO,
            max_speed: self.config.agent_max_speed,
            mass: self.config.agent_mass,
            ai_controlled,
            spawn_position: position,
            behavior,
            perception: PerceptionModel::new(self.config.perception),
            path: None,
            physics: None,
        });

        self.hooks.create_representation(id, &name);
        log::info!("Spawned {} at {:?}", id, position);
        Ok(id)
    }

    /// Despawn an agent, releasing its path, throttle state and proxy.
    /// Idempotent on unknown ids.
    pub fn despawn(&mut self, id: AgentId) {
        let Some(index) = self.agents.iter().position(|a| a.id == id) else {
            return;
        };
        // Dropping the agent cancels its path with it
        self.agents.remove(index);
        self.cache.forget_agent(id);
        self.threats.remove(&id);
        self.hooks.destroy_representation(id);
        self.recycler.recycle(id);
        log::info!("Despawned {}", id);
    }

    /// Toggle whether the behavior machine drives the agent's movement
    pub fn set_ai_controlled(&mut self, id: AgentId, enabled: bool) -> Result<()> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(SimError::UnknownAgent(id))?;
        agent.ai_controlled = enabled;
        Ok(())
    }

    /// Route an agent to `target`. Returns whether a path was accepted;
    /// a disconnected or empty mesh rejects the request.
    pub fn set_destination(&mut self, id: AgentId, target: Vec3) -> bool {
        let Some(agent) = self.agents.iter_mut().find(|a| a.id == id) else {
            log::warn!("Destination for unknown agent {}", id);
            return false;
        };
        match self.nav.mesh().find_path(agent.position, target) {
            Ok(path) if !path.is_empty() => {
                agent.path = Some(path);
                true
            }
            Ok(_) => false,
            Err(err) => {
                log::debug!("Destination rejected for {}: {}", id, err);
                false
            }
        }
    }

    /// Broadcast a disturbance (noise, impact) at `position`.
    ///
    /// Agents within `radius` grow alert in proportion to `strength` and
    /// remember the spot; agents very close to it treat it as an active
    /// threat and may flee.
    pub fn notice_disturbance(&mut self, position: Vec3, radius: f32, strength: f32) {
        for agent in &mut self.agents {
            let distance = agent.position.distance(position);
            if distance <= radius {
                agent.perception.notice_disturbance(position, strength);
            }
            if distance <= radius * 0.25 {
                self.threats.insert(agent.id, position);
            }
        }
    }

    /// Advance the whole simulation by `delta_time` seconds
    pub fn tick(&mut self, delta_time: f32) {
        self.clock.advance(delta_time);
        let now = self.clock.now();

        // Deliver completed chunk generations into the cache
        for (key, payload) in self.pool.drain_completed() {
            match self.cache.on_generated(key, payload, now) {
                Ok(true) => self.nav.mark_dirty(),
                Ok(false) => {}
                Err(err) => log::debug!("Dropping stale chunk delivery: {}", err),
            }
        }

        // Evicting resident surface shrinks the walkable set
        if self.cache.evict(now) > 0 {
            self.nav.mark_dirty();
        }

        self.nav.poll();
        self.nav.kick_rebuild(self.cache.resident_geometry());

        for index in 0..self.agents.len() {
            self.tick_agent(index, delta_time, now);
        }
    }

    /// Run one agent's perception, behavior, movement and proxy sync
    fn tick_agent(&mut self, index: usize, delta_time: f32, now: f64) {
        let id = self.agents[index].id;
        let position = self.agents[index].position;

        self.cache
            .ensure_resident(id, position, now, &mut self.pool);

        // Candidates may include positions already updated earlier this
        // tick; that skew is accepted.
        let candidates: Vec<(EntityId, Vec3, bool)> = self
            .agents
            .iter()
            .filter(|other| other.id != id)
            .map(|other| (EntityId::from(other.id), other.position, other.ai_controlled))
            .collect();
        let sightable: Vec<(EntityId, Vec3)> =
            candidates.iter().map(|&(e, p, _)| (e, p)).collect();

        let cache = &self.cache;
        let agent = &mut self.agents[index];
        let facing = agent.facing();
        agent.perception.update_visibility(
            &sightable,
            position,
            facing,
            now,
            |from, to| {
                cache.line_blocked(from + Vec3::Y * EYE_HEIGHT, to + Vec3::Y * EYE_HEIGHT)
            },
        );
        agent.perception.decay(delta_time, now);

        let mut speed_multiplier = 1.0;
        if agent.ai_controlled {
            let visible_target = candidates
                .iter()
                .filter(|(entity, _, ai)| {
                    !ai && agent
                        .perception
                        .record(*entity)
                        .map(|r| r.visible)
                        .unwrap_or(false)
                })
                .min_by(|a, b| {
                    position
                        .distance_squared(a.1)
                        .partial_cmp(&position.distance_squared(b.1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|&(entity, p, _)| (entity, p));

            // An active chase follows its own target, which may not be
            // the closest candidate
            let target_sighting = match agent.behavior.state() {
                BehaviorState::Chase { target, .. } => agent
                    .perception
                    .record(*target)
                    .filter(|r| r.visible)
                    .map(|r| (*target, r.last_known_position)),
                _ => None,
            };

            let ctx = BehaviorContext {
                position,
                spawn_position: agent.spawn_position,
                visible_target,
                target_sighting,
                alert: agent.perception.alert(),
                point_of_interest: agent.perception.point_of_interest(),
                threat: self.threats.remove(&id),
            };

            let command = agent.behavior.update(&ctx, delta_time, &mut self.rng);
            speed_multiplier = command.speed_multiplier;

            match command.destination {
                Some(destination) => {
                    let repath = agent
                        .path
                        .as_ref()
                        .and_then(|p| p.destination())
                        .map(|current| current.distance(destination) > REPATH_DISTANCE)
                        .unwrap_or(true);
                    if repath {
                        match self.nav.mesh().find_path(position, destination) {
                            Ok(path) if !path.is_empty() => agent.path = Some(path),
                            Ok(_) => agent.path = None,
                            Err(err) => {
                                // Recovered locally; the machine falls back
                                // on its own give-up timers
                                log::debug!("Path query failed for {}: {}", id, err);
                                agent.path = None;
                            }
                        }
                    }
                }
                None => agent.path = None,
            }
        }

        self.movement
            .advance(agent, cache, delta_time, speed_multiplier);
        self.hooks
            .update_representation(id, agent.position, agent.yaw);
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn streaming_stats(&self) -> StreamingStats {
        self.cache.stats()
    }

    pub fn nav_region_count(&self) -> usize {
        self.nav.region_count()
    }

    pub fn cache(&self) -> &TerrainStreamingCache {
        &self.cache
    }

    pub fn nav(&self) -> &NavMeshService {
        &self.nav
    }
}
