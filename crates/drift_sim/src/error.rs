//! Simulation error types

use drift_core::AgentId;
use thiserror::Error;

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimError {
    /// Shared agent assets or collaborators are not ready yet
    #[error("Agent resources are not available yet")]
    ResourceUnavailable,

    /// An id that names no live agent
    #[error("Unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error(transparent)]
    Terrain(#[from] drift_terrain::TerrainError),

    #[error(transparent)]
    Nav(#[from] drift_nav::NavError),
}

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;
