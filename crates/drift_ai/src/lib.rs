//! Drift AI - perception and behavior
//!
//! Each agent carries a [`PerceptionModel`] (vision cone, sighting memory,
//! decaying alert level) and a [`BehaviorMachine`] (a closed-set finite
//! state machine over Idle, Patrol, Investigate, Chase, Flee and Explore).
//!
//! Behavior output is a [`BehaviorCommand`] naming where the agent wants to
//! go and how fast; turning that into an actual route over the walkable
//! surface is the caller's job. The machine never touches navigation or
//! physics directly.

pub mod behavior;
pub mod perception;

pub mod prelude {
    pub use crate::behavior::{
        BehaviorCommand, BehaviorConfig, BehaviorContext, BehaviorKind, BehaviorMachine,
        BehaviorState,
    };
    pub use crate::perception::{PerceptionConfig, PerceptionModel, PerceptionRecord};
}

pub use prelude::*;
