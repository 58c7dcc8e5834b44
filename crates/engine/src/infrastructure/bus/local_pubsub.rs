//! In-memory publish/subscribe transport.
//!
//! Behaves like a broker channel namespace: publishing to a channel with no
//! subscribers drops the payload, and each subscriber gets its own copy.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::infrastructure::ports::{BusError, PubSubTransport};

pub struct LocalPubSub {
    channels: DashMap<String, broadcast::Sender<String>>,
    capacity: usize,
}

impl LocalPubSub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl PubSubTransport for LocalPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        if self.sender(channel).send(payload).is_err() {
            tracing::trace!(channel, "Published to channel with no subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BusError> {
        // Subscribe before returning so nothing published afterwards is missed.
        let mut source = self.sender(channel).subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        let channel = channel.to_string();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %channel, skipped, "Subscriber lagged, payloads dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}
