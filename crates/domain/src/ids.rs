use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::session_id_factory::{GATEWAY_MASK, GATEWAY_SHIFT};

/// Globally unique identifier of one player session.
///
/// Allocated once by a [`SessionIdFactory`](crate::SessionIdFactory) at the
/// gateway and carried verbatim across every handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Gateway that allocated this session.
    pub fn gateway_id(self) -> GatewayId {
        GatewayId(((self.0 >> GATEWAY_SHIFT) & GATEWAY_MASK) as u16)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Identifier of a client-facing gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(u16);

impl GatewayId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one engine process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EngineId(String);

impl EngineId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("engine id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EngineId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EngineId> for String {
    fn from(value: EngineId) -> Self {
        value.0
    }
}

impl PartialEq<str> for EngineId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EngineId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A room address of the form `zone:room`.
///
/// The zone part is the unit of engine ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId {
    zone: String,
    room: String,
}

impl RoomId {
    pub fn new(zone: impl Into<String>, room: impl Into<String>) -> Result<Self, DomainError> {
        let zone = zone.into();
        let room = room.into();
        if zone.is_empty() || zone.contains(':') {
            return Err(DomainError::invalid_id(format!("invalid zone '{zone}'")));
        }
        if room.is_empty() {
            return Err(DomainError::invalid_id(format!(
                "room id in zone '{zone}' cannot be empty"
            )));
        }
        Ok(Self { zone, room })
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn room(&self) -> &str {
        &self.room
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.zone, self.room)
    }
}

impl FromStr for RoomId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (zone, room) = s
            .split_once(':')
            .ok_or_else(|| DomainError::invalid_id(format!("room id '{s}' has no zone")))?;
        Self::new(zone, room)
    }
}

impl TryFrom<String> for RoomId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.to_string()
    }
}
