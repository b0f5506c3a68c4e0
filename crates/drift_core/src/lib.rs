//! Drift Core - identifiers and session time
//!
//! Shared primitives for the agent subsystem: generational ids for agents
//! and observed entities, an id recycler, and an explicitly constructed
//! session clock (no global time, no process-wide singletons).

pub mod clock;
pub mod id;

pub mod prelude {
    pub use crate::clock::SimClock;
    pub use crate::id::{AgentId, EntityId, IdRecycler};
}

pub use prelude::*;
