//! Error types for the navigation system

use thiserror::Error;

/// Navigation errors
#[derive(Debug, Error)]
pub enum NavError {
    /// The current build has no walkable regions
    #[error("Navigation mesh has no walkable regions")]
    EmptyMesh,

    /// The endpoints lie in disconnected parts of the mesh
    #[error("No route between region {from} and region {to}")]
    NoRoute { from: usize, to: usize },
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavError>;
