//! External boundary port traits (inter-engine bus, gateway sink, scale actuator).

use async_trait::async_trait;
use mudmesh_domain::{EngineId, ScaleDecision};
use mudmesh_shared::InterEngineMessage;
use tokio::sync::mpsc;

use super::error::{BusError, ScaleError};
use super::types::OutboundEvent;

// =============================================================================
// Inter-Engine Bus
// =============================================================================

/// Asynchronous transport between engine processes.
///
/// No ordering guarantee across sessions. `send_to` may wait when the
/// receiving side applies backpressure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterEngineBus: Send + Sync {
    async fn start(&self) -> Result<(), BusError>;

    async fn send_to(
        &self,
        target: &EngineId,
        message: InterEngineMessage,
    ) -> Result<(), BusError>;

    /// Messages addressed to this engine. Yields the receiver once; later
    /// calls return `None`.
    async fn incoming(&self) -> Option<mpsc::Receiver<InterEngineMessage>>;

    async fn close(&self);
}

/// Raw publish/subscribe transport underneath the distributed bus.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError>;

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BusError>;
}

// =============================================================================
// Gateway Sink
// =============================================================================

/// Sink for player-visible text and session redirects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutboundPort: Send + Sync {
    async fn emit(&self, event: OutboundEvent);
}

// =============================================================================
// Scale Actuator
// =============================================================================

/// Executes scaling intents (starting or retiring engine instances).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScaleActuator: Send + Sync {
    async fn apply(&self, decision: &ScaleDecision) -> Result<(), ScaleError>;
}
