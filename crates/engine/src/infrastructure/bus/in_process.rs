//! In-process inter-engine bus.
//!
//! Every engine in the process registers an inbox on a shared [`LocalBusHub`];
//! sending is a direct channel push into the target's inbox.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use mudmesh_domain::EngineId;
use mudmesh_shared::InterEngineMessage;
use tokio::sync::{mpsc, Mutex};

use crate::infrastructure::ports::{BusError, InterEngineBus};

/// Routing table shared by all in-process engines.
#[derive(Default)]
pub struct LocalBusHub {
    routes: DashMap<EngineId, mpsc::Sender<InterEngineMessage>>,
}

impl LocalBusHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Engines currently reachable through this hub.
    pub fn engines(&self) -> Vec<EngineId> {
        self.routes.iter().map(|r| r.key().clone()).collect()
    }

    fn route(&self, engine_id: &EngineId) -> Option<mpsc::Sender<InterEngineMessage>> {
        // Clone out so the shard guard is released before any await.
        self.routes.get(engine_id).map(|r| r.value().clone())
    }
}

pub struct InProcessBus {
    engine_id: EngineId,
    hub: Arc<LocalBusHub>,
    /// Inbox sender, moved into the hub on `start`.
    pending: Mutex<Option<mpsc::Sender<InterEngineMessage>>>,
    inbox: Mutex<Option<mpsc::Receiver<InterEngineMessage>>>,
}

impl InProcessBus {
    pub fn new(hub: Arc<LocalBusHub>, engine_id: EngineId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            engine_id,
            hub,
            pending: Mutex::new(Some(tx)),
            inbox: Mutex::new(Some(rx)),
        }
    }

    pub fn engine_id(&self) -> &EngineId {
        &self.engine_id
    }
}

#[async_trait]
impl InterEngineBus for InProcessBus {
    async fn start(&self) -> Result<(), BusError> {
        let Some(sender) = self.pending.lock().await.take() else {
            // Already started, or closed.
            return Ok(());
        };
        if let Some(previous) = self.hub.routes.insert(self.engine_id.clone(), sender) {
            tracing::warn!(
                engine_id = %self.engine_id,
                "Replaced an existing in-process route for engine"
            );
            drop(previous);
        }
        tracing::debug!(engine_id = %self.engine_id, "In-process bus started");
        Ok(())
    }

    async fn send_to(
        &self,
        target: &EngineId,
        message: InterEngineMessage,
    ) -> Result<(), BusError> {
        let sender = self
            .hub
            .route(target)
            .ok_or_else(|| BusError::UnknownEngine(target.clone()))?;
        sender.send(message).await.map_err(|_| BusError::Closed)
    }

    async fn incoming(&self) -> Option<mpsc::Receiver<InterEngineMessage>> {
        self.inbox.lock().await.take()
    }

    async fn close(&self) {
        self.pending.lock().await.take();
        self.hub.routes.remove(&self.engine_id);
        tracing::debug!(engine_id = %self.engine_id, "In-process bus closed");
    }
}
