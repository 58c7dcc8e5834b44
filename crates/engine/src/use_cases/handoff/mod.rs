//! Player handoff between engines.
//!
//! Sender side: `initiate_handoff`, then `handle_ack` or `expire_timed_out`.
//! Receiver side: `accept_handoff`.

mod manager;
mod serialization;

use std::sync::Arc;

use mudmesh_domain::{EngineAddress, EngineId, RoomId, SessionId};

use crate::infrastructure::ports::{BusError, RepoError};

pub use manager::HandoffManager;
pub use serialization::{
    deserialize_item, deserialize_player, serialize_item, serialize_player, RestoredPlayer,
};

/// Answers whether a room is hosted by the embedding engine.
pub type RoomLocality = Arc<dyn Fn(&RoomId) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffConfig {
    /// How long a sent handoff may wait for its ack.
    pub ack_timeout_ms: i64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 2_000,
        }
    }
}

/// Sender-side record of a handoff awaiting its ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitRecord {
    pub session_id: SessionId,
    pub target: EngineAddress,
    pub target_room_id: RoomId,
    pub started_at_ms: i64,
    /// Distinguishes successive handoffs of one session.
    pub attempt: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffResult {
    Initiated,
    PlayerNotFound,
    NoEngineForZone,
    AlreadyInTransit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckResult {
    /// The target took the player; the session was redirected to `target`.
    Completed { target: EngineAddress },
    /// The target refused; the player stays here.
    Failed(String),
    /// No handoff was waiting for this ack.
    Unknown,
}

/// A handoff whose ack never arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredHandoff {
    pub session_id: SessionId,
    pub target_engine_id: EngineId,
    pub target_room_id: RoomId,
    pub age_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
