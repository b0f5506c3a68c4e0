//! Error types for the terrain streaming system

use crate::chunk::ChunkKey;
use thiserror::Error;

/// Terrain streaming errors
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Completion arrived for a chunk the cache no longer tracks
    #[error("No record for chunk {0:?}")]
    UnknownChunk(ChunkKey),
}

/// Result type for terrain operations
pub type Result<T> = std::result::Result<T, TerrainError>;
