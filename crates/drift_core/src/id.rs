//! Unique identifier generation with generational indices

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A unique agent identifier with a generation counter for safe reuse
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId {
    /// Lower 32 bits: index, Upper 32 bits: generation
    bits: u64,
}

impl AgentId {
    /// Create a new ID from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
        }
    }

    /// Create a null/invalid ID
    #[inline]
    pub const fn null() -> Self {
        Self { bits: u64::MAX }
    }

    /// Check if this ID is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == u64::MAX
    }

    /// Get the index portion
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation portion
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "AgentId(null)")
        } else {
            write!(f, "AgentId({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifier for any observable entity (agents, players, props)
///
/// Agents expose their id as an `EntityId` to the perception layer so that
/// perception records never hold owning references back into the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl From<AgentId> for EntityId {
    fn from(id: AgentId) -> Self {
        Self(id.to_bits())
    }
}

/// Recycler for agent IDs, stable across spawn/despawn cycles
///
/// Reused indices get an incremented generation so stale ids held by other
/// systems never alias a newly spawned agent.
#[derive(Clone, Debug, Default)]
pub struct IdRecycler {
    /// Recycled IDs available for reuse
    recycled: VecDeque<AgentId>,
    /// Next fresh index to allocate
    next_index: u32,
}

impl IdRecycler {
    /// Create a new recycler
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an ID (reuses recycled indices when available)
    pub fn allocate(&mut self) -> AgentId {
        if let Some(id) = self.recycled.pop_front() {
            AgentId::new(id.index(), id.generation().wrapping_add(1))
        } else {
            let index = self.next_index;
            self.next_index = self.next_index.wrapping_add(1);
            AgentId::new(index, 0)
        }
    }

    /// Return an ID for later reuse
    pub fn recycle(&mut self, id: AgentId) {
        self.recycled.push_back(id);
    }

    /// Number of recycled IDs available
    pub fn recycled_count(&self) -> usize {
        self.recycled.len()
    }
}
