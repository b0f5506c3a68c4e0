//! World integration hooks
//!
//! The simulation owns agents; everything visible about them (render
//! proxies, scene attachments) belongs to the host. The host implements
//! this trait and the orchestrator calls it on spawn, despawn and once per
//! agent per tick.

use drift_core::AgentId;
use glam::Vec3;

/// Host-side callbacks for agent lifecycle and presentation
pub trait WorldHooks {
    /// Whether shared agent assets (models, scene, physics) are loaded.
    /// Spawning fails while this is false.
    fn assets_ready(&self) -> bool {
        true
    }

    /// A new agent needs a visible representation
    fn create_representation(&mut self, id: AgentId, name: &str);

    /// An agent was despawned; release its representation
    fn destroy_representation(&mut self, id: AgentId);

    /// Per-tick transform sync for one agent
    fn update_representation(&mut self, id: AgentId, position: Vec3, yaw: f32);
}

/// Hooks that do nothing, for headless runs and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl WorldHooks for NullHooks {
    fn create_representation(&mut self, _id: AgentId, _name: &str) {}
    fn destroy_representation(&mut self, _id: AgentId) {}
    fn update_representation(&mut self, _id: AgentId, _position: Vec3, _yaw: f32) {}
}
