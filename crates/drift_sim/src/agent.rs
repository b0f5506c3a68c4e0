//! Agent state

use drift_ai::{BehaviorMachine, PerceptionModel};
use drift_core::AgentId;
use drift_nav::NavPath;
use glam::Vec3;

/// Per-agent vertical physics, created lazily on the first movement tick
#[derive(Debug, Clone, Copy)]
pub struct PhysicsState {
    /// Downward-positive fall speed
    pub vertical_velocity: f32,
    /// Whether the agent rested on terrain last tick
    pub grounded: bool,
    /// Last committed position known to be finite and supported
    pub last_stable_position: Vec3,
}

impl PhysicsState {
    pub fn at(position: Vec3) -> Self {
        Self {
            vertical_velocity: 0.0,
            grounded: false,
            last_stable_position: position,
        }
    }
}

/// One simulated character
#[derive(Debug)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub position: Vec3,
    /// Heading around the world Y axis, radians
    pub yaw: f32,
    pub velocity: Vec3,
    pub max_speed: f32,
    pub mass: f32,
    pub ai_controlled: bool,
    /// Where the agent was spawned; patrol loops center here
    pub spawn_position: Vec3,
    pub(crate) behavior: BehaviorMachine,
    pub(crate) perception: PerceptionModel,
    /// At most one active path; replaced atomically, cleared when exhausted
    pub(crate) path: Option<NavPath>,
    pub(crate) physics: Option<PhysicsState>,
}

impl Agent {
    /// Unit facing vector derived from yaw
    pub fn facing(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn behavior(&self) -> &BehaviorMachine {
        &self.behavior
    }

    pub fn perception(&self) -> &PerceptionModel {
        &self.perception
    }

    pub fn path(&self) -> Option<&NavPath> {
        self.path.as_ref()
    }

    pub fn physics(&self) -> Option<&PhysicsState> {
        self.physics.as_ref()
    }

    pub fn is_grounded(&self) -> bool {
        self.physics.map(|p| p.grounded).unwrap_or(false)
    }
}
