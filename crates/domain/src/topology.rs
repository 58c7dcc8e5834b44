//! Engine topology value types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::EngineId;

/// Identity and reachability of one engine process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineAddress {
    pub engine_id: EngineId,
    pub host: String,
    pub port: u16,
}

impl EngineAddress {
    pub fn new(engine_id: EngineId, host: impl Into<String>, port: u16) -> Self {
        Self {
            engine_id,
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for EngineAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.engine_id, self.host, self.port)
    }
}

/// The zones one engine claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    pub address: EngineAddress,
    pub zones: BTreeSet<String>,
}

impl ZoneAssignment {
    pub fn new<I, S>(address: EngineAddress, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            address,
            zones: zones.into_iter().map(Into::into).collect(),
        }
    }
}

/// One engine serving one zone, annotated with its last reported load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInstance {
    pub engine_id: EngineId,
    pub address: EngineAddress,
    pub zone: String,
    pub player_count: u32,
}

/// How zone claims are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneMode {
    /// Every zone has exactly one owning engine.
    #[default]
    Classic,
    /// A zone may be served by several engine replicas.
    Instanced,
}

impl fmt::Display for ZoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneMode::Classic => write!(f, "classic"),
            ZoneMode::Instanced => write!(f, "instanced"),
        }
    }
}
