//! Item instances carried or worn by players.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Where an item is worn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSlot {
    Head,
    Body,
    Hand,
    OffHand,
}

impl ItemSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSlot::Head => "head",
            ItemSlot::Body => "body",
            ItemSlot::Hand => "hand",
            ItemSlot::OffHand => "off_hand",
        }
    }
}

impl fmt::Display for ItemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSlot {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "head" => Ok(ItemSlot::Head),
            "body" => Ok(ItemSlot::Body),
            "hand" => Ok(ItemSlot::Hand),
            "off_hand" | "offhand" => Ok(ItemSlot::OffHand),
            other => Err(DomainError::parse(format!("Unknown item slot: {other}"))),
        }
    }
}

/// One concrete item, with the stats needed to rebuild it anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub keyword: String,
    pub display_name: String,
    pub description: Option<String>,
    pub slot: Option<ItemSlot>,
    pub damage: i32,
    pub armor: i32,
    pub constitution: i32,
    pub match_by_key: bool,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        keyword: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            keyword: keyword.into(),
            display_name: display_name.into(),
            description: None,
            slot: None,
            damage: 0,
            armor: 0,
            constitution: 0,
            match_by_key: false,
        }
    }

    pub fn with_slot(mut self, slot: ItemSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
