//! In-memory player and item registries.
//!
//! The engine's authoritative live state. Nothing here survives a restart;
//! persistence backends implement the same ports elsewhere.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use mudmesh_domain::{Item, ItemSlot, PlayerState, SessionId};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{ItemRepo, PlayerRepo, RepoError};

pub struct InMemoryPlayerRepo {
    players: RwLock<HashMap<SessionId, PlayerState>>,
}

impl InMemoryPlayerRepo {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPlayerRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerRepo for InMemoryPlayerRepo {
    async fn get(&self, session_id: SessionId) -> Result<Option<PlayerState>, RepoError> {
        Ok(self.players.read().await.get(&session_id).cloned())
    }

    async fn save(&self, player: &PlayerState) -> Result<(), RepoError> {
        self.players
            .write()
            .await
            .insert(player.session_id, player.clone());
        Ok(())
    }

    async fn remove(&self, session_id: SessionId) -> Result<Option<PlayerState>, RepoError> {
        Ok(self.players.write().await.remove(&session_id))
    }

    async fn list(&self) -> Result<Vec<PlayerState>, RepoError> {
        Ok(self.players.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
struct Carried {
    inventory: Vec<Item>,
    equipment: BTreeMap<ItemSlot, Item>,
}

pub struct InMemoryItemRepo {
    carried: RwLock<HashMap<SessionId, Carried>>,
}

impl InMemoryItemRepo {
    pub fn new() -> Self {
        Self {
            carried: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryItemRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemRepo for InMemoryItemRepo {
    async fn inventory(&self, session_id: SessionId) -> Result<Vec<Item>, RepoError> {
        Ok(self
            .carried
            .read()
            .await
            .get(&session_id)
            .map(|c| c.inventory.clone())
            .unwrap_or_default())
    }

    async fn equipment(
        &self,
        session_id: SessionId,
    ) -> Result<BTreeMap<ItemSlot, Item>, RepoError> {
        Ok(self
            .carried
            .read()
            .await
            .get(&session_id)
            .map(|c| c.equipment.clone())
            .unwrap_or_default())
    }

    async fn restore(
        &self,
        session_id: SessionId,
        inventory: Vec<Item>,
        equipment: BTreeMap<ItemSlot, Item>,
    ) -> Result<(), RepoError> {
        self.carried.write().await.insert(
            session_id,
            Carried {
                inventory,
                equipment,
            },
        );
        Ok(())
    }

    async fn remove_all(&self, session_id: SessionId) -> Result<(), RepoError> {
        self.carried.write().await.remove(&session_id);
        Ok(())
    }
}
