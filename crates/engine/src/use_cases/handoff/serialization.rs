//! Conversion between live player state and the handoff snapshot.

use std::collections::BTreeMap;

use mudmesh_domain::{Item, ItemSlot, PlayerId, PlayerState, RoomId};
use mudmesh_shared::{SerializedItem, SerializedPlayerState};

/// A player rebuilt from a snapshot, ready to insert into local registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredPlayer {
    pub player: PlayerState,
    pub inventory: Vec<Item>,
    pub equipment: BTreeMap<ItemSlot, Item>,
}

pub fn serialize_item(item: &Item) -> SerializedItem {
    SerializedItem {
        id: item.id.clone(),
        keyword: item.keyword.clone(),
        display_name: item.display_name.clone(),
        description: item.description.clone(),
        slot: item.slot,
        damage: item.damage,
        armor: item.armor,
        constitution: item.constitution,
        match_by_key: item.match_by_key,
    }
}

pub fn deserialize_item(item: SerializedItem) -> Item {
    Item {
        id: item.id,
        keyword: item.keyword,
        display_name: item.display_name,
        description: item.description,
        slot: item.slot,
        damage: item.damage,
        armor: item.armor,
        constitution: item.constitution,
        match_by_key: item.match_by_key,
    }
}

pub fn serialize_player(
    player: &PlayerState,
    inventory: &[Item],
    equipment: &BTreeMap<ItemSlot, Item>,
) -> SerializedPlayerState {
    SerializedPlayerState {
        session_id: player.session_id,
        player_id: player.player_id.map(PlayerId::as_i64),
        name: player.name.clone(),
        room_id: player.room_id.clone(),
        hp: player.hp,
        max_hp: player.max_hp,
        base_max_hp: player.base_max_hp,
        constitution: player.constitution,
        level: player.level,
        xp_total: player.xp_total,
        ansi_enabled: player.ansi_enabled,
        is_staff: player.is_staff,
        password_hash: player.password_hash.clone(),
        created_at_epoch_ms: player.created_at_epoch_ms,
        last_seen_epoch_ms: player.last_seen_epoch_ms,
        inventory_items: inventory.iter().map(serialize_item).collect(),
        equipped_items: equipment
            .iter()
            .map(|(slot, item)| (*slot, serialize_item(item)))
            .collect(),
    }
}

/// Rebuild a player, placing them in `room_id` regardless of the room the
/// snapshot was taken in.
pub fn deserialize_player(state: SerializedPlayerState, room_id: RoomId) -> RestoredPlayer {
    let player = PlayerState {
        session_id: state.session_id,
        player_id: state.player_id.map(PlayerId::new),
        name: state.name,
        room_id,
        hp: state.hp,
        max_hp: state.max_hp,
        base_max_hp: state.base_max_hp,
        constitution: state.constitution,
        level: state.level,
        xp_total: state.xp_total,
        ansi_enabled: state.ansi_enabled,
        is_staff: state.is_staff,
        password_hash: state.password_hash,
        created_at_epoch_ms: state.created_at_epoch_ms,
        last_seen_epoch_ms: state.last_seen_epoch_ms,
    };

    RestoredPlayer {
        player,
        inventory: state
            .inventory_items
            .into_iter()
            .map(deserialize_item)
            .collect(),
        equipment: state
            .equipped_items
            .into_iter()
            .map(|(slot, item)| (slot, deserialize_item(item)))
            .collect(),
    }
}
