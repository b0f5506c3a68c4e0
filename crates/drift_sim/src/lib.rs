//! Drift Sim - autonomous agents over streamed terrain
//!
//! Ties the subsystem together: agents spawn into a world whose terrain is
//! generated on worker threads, perceive each other, pick behaviors, path
//! across the navmesh and move on the resident surface.
//!
//! # Architecture
//!
//! ```text
//!                    ┌────────────────────────┐
//!                    │       Simulation       │
//!                    │  tick(dt), spawn, ...  │
//!                    └───┬───────┬───────┬────┘
//!          streaming     │       │       │     proxy sync
//!        ┌───────────────▼──┐ ┌──▼────┐ ┌▼───────────┐
//!        │ TerrainStreaming │ │ AI    │ │ WorldHooks │
//!        │ Cache + Pool     │ │ per-  │ │ (host)     │
//!        └────────┬─────────┘ │ agent │ └────────────┘
//!                 │ dirty     └──┬────┘
//!        ┌────────▼─────────┐    │ find_path
//!        │ NavMeshService   ◀────┘
//!        └──────────────────┘
//! ```
//!
//! The tick is single-threaded and cooperative; chunk generation and
//! navmesh rebuilds run on background threads and deliver results back
//! into the tick through channels.

pub mod agent;
pub mod config;
pub mod error;
pub mod hooks;
pub mod movement;
pub mod orchestrator;

pub mod prelude {
    pub use crate::agent::{Agent, PhysicsState};
    pub use crate::config::SimConfig;
    pub use crate::error::{Result, SimError};
    pub use crate::hooks::{NullHooks, WorldHooks};
    pub use crate::movement::{MovementConfig, MovementResolver};
    pub use crate::orchestrator::Simulation;
}

pub use prelude::*;
