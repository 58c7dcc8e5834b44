//! Helper types for port operations.

use mudmesh_domain::{EngineAddress, EngineId, SessionId};

// =============================================================================
// Outbound Events
// =============================================================================

/// Something the transport layer must deliver on behalf of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Player-visible text.
    SendText { session_id: SessionId, text: String },
    /// Re-point the session's gateway connection at another engine.
    SessionRedirect {
        session_id: SessionId,
        engine_id: EngineId,
        host: String,
        port: u16,
    },
}

impl OutboundEvent {
    pub fn text(session_id: SessionId, text: impl Into<String>) -> Self {
        Self::SendText {
            session_id,
            text: text.into(),
        }
    }

    pub fn redirect(session_id: SessionId, target: &EngineAddress) -> Self {
        Self::SessionRedirect {
            session_id,
            engine_id: target.engine_id.clone(),
            host: target.host.clone(),
            port: target.port,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SendText { session_id, .. } | Self::SessionRedirect { session_id, .. } => {
                *session_id
            }
        }
    }
}
