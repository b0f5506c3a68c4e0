//! Simulation configuration

use crate::movement::MovementConfig;
use drift_ai::{BehaviorConfig, PerceptionConfig};
use drift_nav::NavConfig;
use drift_terrain::StreamingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration aggregating every subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub streaming: StreamingConfig,
    pub nav: NavConfig,
    pub perception: PerceptionConfig,
    pub behavior: BehaviorConfig,
    pub movement: MovementConfig,
    /// Chunk generation worker threads
    pub workers: usize,
    /// Seed for behavior randomness; a fixed seed replays identically
    pub seed: u64,
    /// Top speed of newly spawned agents, m/s
    pub agent_max_speed: f32,
    /// Mass of newly spawned agents, kg
    pub agent_mass: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            streaming: StreamingConfig::default(),
            nav: NavConfig::default(),
            perception: PerceptionConfig::default(),
            behavior: BehaviorConfig::default(),
            movement: MovementConfig::default(),
            workers: 2,
            seed: 0,
            agent_max_speed: 4.0,
            agent_mass: 70.0,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
