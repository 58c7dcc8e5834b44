//! Live player state as held by the owning engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, SessionId};

/// Persistent account identifier, absent for guests that never saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(i64);

impl PlayerId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything an engine knows about a connected player, minus items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub session_id: SessionId,
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub room_id: RoomId,
    pub hp: i32,
    pub max_hp: i32,
    pub base_max_hp: i32,
    pub constitution: i32,
    pub level: i32,
    pub xp_total: i64,
    pub ansi_enabled: bool,
    pub is_staff: bool,
    pub password_hash: String,
    pub created_at_epoch_ms: i64,
    pub last_seen_epoch_ms: i64,
}

impl PlayerState {
    /// A fresh level-1 character standing in `room_id`.
    pub fn new(
        session_id: SessionId,
        name: impl Into<String>,
        room_id: RoomId,
        now_epoch_ms: i64,
    ) -> Self {
        Self {
            session_id,
            player_id: None,
            name: name.into(),
            room_id,
            hp: 10,
            max_hp: 10,
            base_max_hp: 10,
            constitution: 0,
            level: 1,
            xp_total: 0,
            ansi_enabled: false,
            is_staff: false,
            password_hash: String::new(),
            created_at_epoch_ms: now_epoch_ms,
            last_seen_epoch_ms: now_epoch_ms,
        }
    }

    pub fn with_player_id(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn zone(&self) -> &str {
        self.room_id.zone()
    }
}
