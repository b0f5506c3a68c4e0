//! Drift Nav - navigation mesh service
//!
//! Builds a walkable-surface graph from resident terrain geometry and
//! answers path and nearest-point queries against it.
//!
//! The mesh is immutable per build. Rebuilds run on a background thread;
//! until one completes, every query is answered from the previous build,
//! and completion swaps the whole mesh in one `Arc` assignment. There is
//! never a partially built mesh visible to a caller.

pub mod error;
pub mod mesh;
pub mod path;
pub mod service;

pub mod prelude {
    pub use crate::error::{NavError, Result};
    pub use crate::mesh::{NavMesh, NavRegion};
    pub use crate::path::NavPath;
    pub use crate::service::{NavConfig, NavMeshService};
}

pub use prelude::*;
