//! Error types for port operations.

use mudmesh_domain::EngineId;

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Storage operation failed - includes operation name for tracing.
    #[error("Storage error in {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
}

impl RepoError {
    /// Create a Storage error with operation context.
    pub fn storage(operation: &'static str, message: impl ToString) -> Self {
        Self::Storage {
            operation,
            message: message.to_string(),
        }
    }
}

/// Errors from the inter-engine bus.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    /// No route to the addressed engine.
    #[error("No route to engine {0}")]
    UnknownEngine(EngineId),

    /// The bus was closed or the peer's inbox is gone.
    #[error("Bus closed")]
    Closed,

    /// Message could not be encoded for the transport.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The underlying transport failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BusError {
    pub fn encoding(message: impl ToString) -> Self {
        Self::Encoding(message.to_string())
    }
}

/// Errors reported by a scale actuator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScaleError {
    #[error("Scale action rejected: {0}")]
    Rejected(String),
}
