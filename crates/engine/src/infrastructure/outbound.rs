//! Channel-backed outbound sink.
//!
//! The gateway connection layer drains the receiving half and performs the
//! actual writes and redirects.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::infrastructure::ports::{OutboundEvent, OutboundPort};

#[derive(Clone)]
pub struct ChannelOutbound {
    sender: mpsc::Sender<OutboundEvent>,
}

impl ChannelOutbound {
    pub fn new(sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiver the gateway layer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl OutboundPort for ChannelOutbound {
    async fn emit(&self, event: OutboundEvent) {
        let session_id = event.session_id();
        if self.sender.send(event).await.is_err() {
            // Gateway side is gone; the session is being torn down anyway.
            tracing::debug!(session_id = %session_id, "Outbound channel closed, event dropped");
        }
    }
}
