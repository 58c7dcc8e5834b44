//! Inter-engine bus entry point.
//!
//! Drains this engine's bus inbox and dispatches each message to the
//! handoff manager on its own task, so a handler waiting to publish never
//! stops the inbox from draining. Handler failures are logged and never stop
//! the loop.

use std::sync::Arc;

use mudmesh_domain::EngineId;
use mudmesh_shared::InterEngineMessage;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::use_cases::handoff::{AckResult, HandoffManager};

pub struct BusListener {
    handoff: Arc<HandoffManager>,
}

impl BusListener {
    pub fn new(handoff: Arc<HandoffManager>) -> Self {
        Self { handoff }
    }

    /// Run until the inbox closes or `cancel` fires.
    ///
    /// When the inbox closes, handlers already dispatched run to completion;
    /// cancellation aborts them.
    pub async fn run(
        &self,
        mut incoming: mpsc::Receiver<InterEngineMessage>,
        cancel: CancellationToken,
    ) {
        let engine_id = self.handoff.engine_id().clone();
        tracing::info!(engine_id = %engine_id, "Bus listener started");

        let mut handlers = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    handlers.abort_all();
                    break;
                }
                Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                    log_handler_exit(&engine_id, finished);
                }
                next = incoming.recv() => match next {
                    Some(message) => {
                        let handoff = self.handoff.clone();
                        handlers.spawn(async move { dispatch(&handoff, message).await });
                    }
                    None => {
                        tracing::debug!(engine_id = %engine_id, "Bus inbox closed");
                        while let Some(finished) = handlers.join_next().await {
                            log_handler_exit(&engine_id, finished);
                        }
                        break;
                    }
                },
            }
        }

        tracing::info!(engine_id = %engine_id, "Bus listener stopped");
    }
}

fn log_handler_exit(engine_id: &EngineId, finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        if !e.is_cancelled() {
            tracing::error!(engine_id = %engine_id, error = %e, "Bus handler panicked");
        }
    }
}

async fn dispatch(handoff: &HandoffManager, message: InterEngineMessage) {
    let session_id = message.session_id();
    match message {
        InterEngineMessage::PlayerHandoff(request) => {
            let source = request.source_engine_id.clone();
            if let Err(e) = handoff.accept_handoff(request).await {
                tracing::error!(
                    session_id = %session_id,
                    source_engine_id = %source,
                    error = %e,
                    "Failed to accept handoff"
                );
            }
        }
        InterEngineMessage::HandoffAck(ack) => match handoff.handle_ack(ack).await {
            Ok(AckResult::Completed { .. } | AckResult::Failed(_)) => {}
            Ok(AckResult::Unknown) => {
                tracing::debug!(session_id = %session_id, "Stray handoff ack");
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to complete handoff"
                );
            }
        },
    }
}
