//! Flattened player snapshots carried inside a handoff.
//!
//! Pure values: no references, no cycles. Every field that a newer sender
//! may omit has a serde default so older and newer engines interoperate.

use std::collections::BTreeMap;

use mudmesh_domain::{ItemSlot, RoomId, SessionId};
use serde::{Deserialize, Serialize};

/// Snapshot of one item, sufficient to rebuild it on another engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedItem {
    pub id: String,
    pub keyword: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<ItemSlot>,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default)]
    pub constitution: i32,
    #[serde(default)]
    pub match_by_key: bool,
}

/// Snapshot of a player, their inventory, and their worn equipment.
///
/// `equipped_items` is ordered so the JSON form is byte-for-byte stable,
/// which the distributed bus relies on when signing envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPlayerState {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<i64>,
    pub name: String,
    pub room_id: RoomId,
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub base_max_hp: i32,
    #[serde(default)]
    pub constitution: i32,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub xp_total: i64,
    #[serde(default)]
    pub ansi_enabled: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub created_at_epoch_ms: i64,
    #[serde(default)]
    pub last_seen_epoch_ms: i64,
    #[serde(default)]
    pub inventory_items: Vec<SerializedItem>,
    #[serde(default)]
    pub equipped_items: BTreeMap<ItemSlot, SerializedItem>,
}

fn default_level() -> i32 {
    1
}
