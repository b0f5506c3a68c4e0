//! Drift Terrain - streamed chunk cache
//!
//! Keeps a bounded, access-driven working set of terrain chunk geometry
//! resident while agents move through a procedurally generated world.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │             TerrainStreamingCache                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────┐  │
//! │  │ ChunkRecords│  │  Throttle   │  │ Eviction │  │
//! │  └─────────────┘  └─────────────┘  └──────────┘  │
//! └───────────────┬──────────────────────────────────┘
//!                 │ request(key, priority)
//!                 ▼
//!         ┌───────────────┐     results channel
//!         │ GeneratorPool ├────────────────────────▶ on_generated()
//!         └───────────────┘
//! ```
//!
//! Requests are de-duplicated on the pending flag; priorities fall off with
//! distance from the requesting agent. Completions are drained back into the
//! simulation tick, never delivered by blocking it.

pub mod cache;
pub mod chunk;
pub mod error;
pub mod worker;

pub mod prelude {
    pub use crate::cache::{StreamingConfig, StreamingStats, TerrainProvider, TerrainStreamingCache};
    pub use crate::chunk::{ChunkGeometry, ChunkKey, ChunkPayload, ChunkRecord, ScalarField, Triangle};
    pub use crate::error::{Result, TerrainError};
    pub use crate::worker::{ChunkSource, GeneratorPool, HeightfieldSource};
}

pub use prelude::*;
