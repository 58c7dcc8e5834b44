//! Shared test helpers: identifier builders, topologies and recording
//! port implementations.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{engine, room, RecordingBus};
//!
//! let bus = Arc::new(RecordingBus::new());
//! // ... drive a use case, then inspect bus.sent()
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mudmesh_domain::{EngineAddress, EngineId, RoomId, ZoneAssignment, ZoneMode};
use mudmesh_shared::InterEngineMessage;
use tokio::sync::mpsc;

use crate::infrastructure::ports::{BusError, InterEngineBus, OutboundEvent, OutboundPort};
use crate::stores::ZoneRegistry;

// =============================================================================
// Builders
// =============================================================================

pub fn engine(id: &str) -> EngineId {
    EngineId::new(id).expect("valid engine id")
}

pub fn room(id: &str) -> RoomId {
    id.parse().expect("valid room id")
}

pub fn address(id: &str, port: u16) -> EngineAddress {
    EngineAddress::new(engine(id), "127.0.0.1", port)
}

/// `engine-a` owns `town`, `engine-b` owns `forest`.
pub fn two_engine_registry() -> Arc<ZoneRegistry> {
    Arc::new(
        ZoneRegistry::new(
            ZoneMode::Classic,
            vec![
                ZoneAssignment::new(address("engine-a", 7001), ["town"]),
                ZoneAssignment::new(address("engine-b", 7002), ["forest"]),
            ],
        )
        .expect("valid topology"),
    )
}

// =============================================================================
// Recording Ports
// =============================================================================

/// Bus that records everything sent through it and delivers nothing.
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(EngineId, InterEngineMessage)>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message as `(target, message)`, in send order.
    pub fn sent(&self) -> Vec<(EngineId, InterEngineMessage)> {
        self.sent.lock().expect("recording lock").clone()
    }

    pub fn handoffs(&self) -> usize {
        self.sent()
            .iter()
            .filter(|(_, m)| matches!(m, InterEngineMessage::PlayerHandoff(_)))
            .count()
    }

    pub fn acks(&self) -> Vec<(EngineId, mudmesh_shared::HandoffAck)> {
        self.sent()
            .into_iter()
            .filter_map(|(target, m)| match m {
                InterEngineMessage::HandoffAck(ack) => Some((target, ack)),
                InterEngineMessage::PlayerHandoff(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl InterEngineBus for RecordingBus {
    async fn start(&self) -> Result<(), BusError> {
        Ok(())
    }

    async fn send_to(
        &self,
        target: &EngineId,
        message: InterEngineMessage,
    ) -> Result<(), BusError> {
        self.sent
            .lock()
            .expect("recording lock")
            .push((target.clone(), message));
        Ok(())
    }

    async fn incoming(&self) -> Option<mpsc::Receiver<InterEngineMessage>> {
        None
    }

    async fn close(&self) {}
}

/// Outbound sink that keeps every event.
#[derive(Default)]
pub struct RecordingOutbound {
    events: Mutex<Vec<OutboundEvent>>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events.lock().expect("recording lock").clone()
    }

    pub fn redirects(&self) -> Vec<OutboundEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, OutboundEvent::SessionRedirect { .. }))
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::SendText { text, .. } => Some(text),
                OutboundEvent::SessionRedirect { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl OutboundPort for RecordingOutbound {
    async fn emit(&self, event: OutboundEvent) {
        self.events.lock().expect("recording lock").push(event);
    }
}
