//! Local player and item registry ports.
//!
//! The engine's authoritative in-memory state sits behind these traits so
//! the handoff protocol can be tested against mocks and swapped onto a
//! persistent backend without touching use cases.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mudmesh_domain::{Item, ItemSlot, PlayerState, SessionId};

use super::error::RepoError;

// =============================================================================
// Player Registry
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerRepo: Send + Sync {
    async fn get(&self, session_id: SessionId) -> Result<Option<PlayerState>, RepoError>;
    /// Create or replace the player keyed by its session id.
    async fn save(&self, player: &PlayerState) -> Result<(), RepoError>;
    async fn remove(&self, session_id: SessionId) -> Result<Option<PlayerState>, RepoError>;
    async fn list(&self) -> Result<Vec<PlayerState>, RepoError>;
}

// =============================================================================
// Item Registry
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn inventory(&self, session_id: SessionId) -> Result<Vec<Item>, RepoError>;
    async fn equipment(
        &self,
        session_id: SessionId,
    ) -> Result<BTreeMap<ItemSlot, Item>, RepoError>;
    /// Replace everything the session carries and wears.
    async fn restore(
        &self,
        session_id: SessionId,
        inventory: Vec<Item>,
        equipment: BTreeMap<ItemSlot, Item>,
    ) -> Result<(), RepoError>;
    async fn remove_all(&self, session_id: SessionId) -> Result<(), RepoError>;
}
