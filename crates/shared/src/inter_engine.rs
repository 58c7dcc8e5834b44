//! Messages exchanged between engine processes.
//!
//! ## Versioning Policy
//!
//! - New fields must carry a serde default (older senders omit them)
//! - New variants are a breaking change: every receiver matches exhaustively
//! - Renaming variants or fields is a breaking change

use mudmesh_domain::{EngineId, GatewayId, RoomId, SessionId};
use serde::{Deserialize, Serialize};

use crate::serialized::SerializedPlayerState;

/// A request to take over a live player session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHandoff {
    pub session_id: SessionId,
    pub target_room_id: RoomId,
    pub player_state: SerializedPlayerState,
    pub gateway_id: GatewayId,
    pub source_engine_id: EngineId,
}

/// The receiving engine's answer to a [`PlayerHandoff`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffAck {
    pub session_id: SessionId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Engine that produced the ack (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_engine_id: Option<EngineId>,
}

impl HandoffAck {
    pub fn accepted(session_id: SessionId, target_engine_id: EngineId) -> Self {
        Self {
            session_id,
            success: true,
            error_message: None,
            target_engine_id: Some(target_engine_id),
        }
    }

    pub fn rejected(
        session_id: SessionId,
        target_engine_id: EngineId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            success: false,
            error_message: Some(reason.into()),
            target_engine_id: Some(target_engine_id),
        }
    }
}

/// Every message kind the inter-engine bus carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InterEngineMessage {
    PlayerHandoff(PlayerHandoff),
    HandoffAck(HandoffAck),
}

impl InterEngineMessage {
    /// The `type` tag used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            InterEngineMessage::PlayerHandoff(_) => "PlayerHandoff",
            InterEngineMessage::HandoffAck(_) => "HandoffAck",
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            InterEngineMessage::PlayerHandoff(handoff) => handoff.session_id,
            InterEngineMessage::HandoffAck(ack) => ack.session_id,
        }
    }
}

impl From<PlayerHandoff> for InterEngineMessage {
    fn from(value: PlayerHandoff) -> Self {
        InterEngineMessage::PlayerHandoff(value)
    }
}

impl From<HandoffAck> for InterEngineMessage {
    fn from(value: HandoffAck) -> Self {
        InterEngineMessage::HandoffAck(value)
    }
}
