//! Signed publish/subscribe inter-engine bus.
//!
//! Each engine subscribes to its own channel (`{prefix}:engine:{id}`). Every
//! envelope carries the
//! sending instance id and an HMAC-SHA256 signature over
//! `"{instanceId}|{type}|{body JSON}"`, where the body is the envelope object
//! without `instanceId` and `signature`, encoded compactly with object keys
//! sorted at every depth. Receivers verify over the body exactly as received,
//! so any producer that follows this rule interoperates regardless of field
//! order or optional fields it chooses to spell out. Anything that does not
//! verify is logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use mudmesh_domain::EngineId;
use mudmesh_shared::InterEngineMessage;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::signing::EnvelopeSigner;
use crate::infrastructure::ports::{BusError, InterEngineBus, PubSubTransport};

const INSTANCE_ID_FIELD: &str = "instanceId";
const SIGNATURE_FIELD: &str = "signature";

pub fn engine_channel(prefix: &str, engine_id: &EngineId) -> String {
    format!("{prefix}:engine:{engine_id}")
}

/// The signed string for an envelope whose body (everything but the instance
/// id and signature) is `body`.
fn canonical(instance_id: &str, body: &Value) -> Result<String, serde_json::Error> {
    let kind = body.get("type").and_then(Value::as_str).unwrap_or_default();
    let body_json = serde_json::to_string(&sorted(body))?;
    Ok(format!("{instance_id}|{kind}|{body_json}"))
}

/// `value` with object keys in ascending order at every depth.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|key| (key.clone(), sorted(&fields[key.as_str()])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Why an inbound payload was dropped.
#[derive(Debug, thiserror::Error)]
enum Rejected {
    #[error("unparsable envelope: {0}")]
    Unparsable(String),
    #[error("unsigned envelope")]
    Unsigned,
    #[error("envelope missing instance id")]
    MissingInstance,
    #[error("signature verification failed")]
    BadSignature,
}

/// Verifies inbound payloads for one subscription.
struct InboundFilter {
    engine_id: EngineId,
    signer: Arc<EnvelopeSigner>,
}

impl InboundFilter {
    fn open(&self, payload: &str) -> Result<InterEngineMessage, Rejected> {
        let mut value: Value =
            serde_json::from_str(payload).map_err(|e| Rejected::Unparsable(e.to_string()))?;
        let fields = value
            .as_object_mut()
            .ok_or_else(|| Rejected::Unparsable("envelope is not an object".to_string()))?;

        let signature = match fields.remove(SIGNATURE_FIELD) {
            Some(Value::String(s)) => s,
            _ => return Err(Rejected::Unsigned),
        };
        let instance_id = match fields.remove(INSTANCE_ID_FIELD) {
            Some(Value::String(s)) => s,
            _ => return Err(Rejected::MissingInstance),
        };

        let signed =
            canonical(&instance_id, &value).map_err(|e| Rejected::Unparsable(e.to_string()))?;
        self.signer
            .verify(&signed, &signature)
            .map_err(|_| Rejected::BadSignature)?;

        serde_json::from_value(value).map_err(|e| Rejected::Unparsable(e.to_string()))
    }

    async fn pump(
        self: Arc<Self>,
        channel: String,
        mut source: mpsc::Receiver<String>,
        inbox: mpsc::Sender<InterEngineMessage>,
    ) {
        while let Some(payload) = source.recv().await {
            match self.open(&payload) {
                Ok(message) => {
                    tracing::debug!(
                        engine_id = %self.engine_id,
                        channel = %channel,
                        kind = message.kind(),
                        session_id = %message.session_id(),
                        "Inter-engine message received"
                    );
                    if inbox.send(message).await.is_err() {
                        break;
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        engine_id = %self.engine_id,
                        channel = %channel,
                        error = %reason,
                        "Dropped inter-engine envelope"
                    );
                }
            }
        }
    }
}

pub struct DistributedBus {
    engine_id: EngineId,
    instance_id: String,
    channel_prefix: String,
    signer: Arc<EnvelopeSigner>,
    transport: Arc<dyn PubSubTransport>,
    inbox_tx: Mutex<Option<mpsc::Sender<InterEngineMessage>>>,
    inbox_rx: Mutex<Option<mpsc::Receiver<InterEngineMessage>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DistributedBus {
    pub fn new(
        engine_id: EngineId,
        transport: Arc<dyn PubSubTransport>,
        signer: EnvelopeSigner,
        channel_prefix: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            engine_id,
            instance_id: Uuid::new_v4().to_string(),
            channel_prefix: channel_prefix.into(),
            signer: Arc::new(signer),
            transport,
            inbox_tx: Mutex::new(Some(tx)),
            inbox_rx: Mutex::new(Some(rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn seal(&self, message: &InterEngineMessage) -> Result<String, BusError> {
        let mut value = serde_json::to_value(message).map_err(BusError::encoding)?;
        let signature = self
            .signer
            .sign(&canonical(&self.instance_id, &value).map_err(BusError::encoding)?);

        let fields = value
            .as_object_mut()
            .ok_or_else(|| BusError::encoding("message did not encode to an object"))?;
        fields.insert(
            INSTANCE_ID_FIELD.to_string(),
            Value::String(self.instance_id.clone()),
        );
        fields.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
        serde_json::to_string(&value).map_err(BusError::encoding)
    }
}

#[async_trait]
impl InterEngineBus for DistributedBus {
    async fn start(&self) -> Result<(), BusError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return Ok(());
        }
        let inbox = self.inbox_tx.lock().await.clone().ok_or(BusError::Closed)?;

        let channel = engine_channel(&self.channel_prefix, &self.engine_id);
        let source = self.transport.subscribe(&channel).await?;
        let filter = Arc::new(InboundFilter {
            engine_id: self.engine_id.clone(),
            signer: self.signer.clone(),
        });
        tasks.push(tokio::spawn(filter.pump(channel, source, inbox)));

        tracing::info!(
            engine_id = %self.engine_id,
            instance_id = %self.instance_id,
            prefix = %self.channel_prefix,
            "Distributed bus started"
        );
        Ok(())
    }

    async fn send_to(
        &self,
        target: &EngineId,
        message: InterEngineMessage,
    ) -> Result<(), BusError> {
        let payload = self.seal(&message)?;
        self.transport
            .publish(&engine_channel(&self.channel_prefix, target), payload)
            .await
    }


    async fn incoming(&self) -> Option<mpsc::Receiver<InterEngineMessage>> {
        self.inbox_rx.lock().await.take()
    }

    async fn close(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.inbox_tx.lock().await.take();
        tracing::info!(engine_id = %self.engine_id, "Distributed bus closed");
    }
}
