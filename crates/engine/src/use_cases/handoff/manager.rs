//! Handoff protocol state machine.
//!
//! A session is either local or in transit. The source engine keeps the
//! player fully live until the target acknowledges; only a positive ack
//! removes anything. Failed and expired handoffs leave the player in place.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mudmesh_domain::{EngineAddress, EngineId, PlayerState, RoomId, SessionId};
use mudmesh_shared::{HandoffAck, PlayerHandoff};
use tokio::sync::Mutex;

use super::serialization::{deserialize_player, serialize_player};
use super::{
    AckResult, ExpiredHandoff, HandoffConfig, HandoffError, HandoffResult, RoomLocality,
    TransitRecord,
};
use crate::infrastructure::ports::{
    ClockPort, InterEngineBus, ItemRepo, OutboundEvent, OutboundPort, PlayerRepo,
};
use crate::stores::ZoneRegistry;

pub(crate) const REJECT_ROOM_NOT_LOCAL: &str = "target room is not hosted here";
pub(crate) const REJECT_SESSION_PRESENT: &str = "session already present";
pub(crate) const REJECT_SESSION_MISMATCH: &str = "player state does not match session";

const DEPARTING_TEXT: &str = "The air shimmers as you step across the threshold...";
const HELD_BACK_TEXT: &str = "The threshold resists you, and you remain where you stand.";

pub struct HandoffManager {
    engine_id: EngineId,
    registry: Arc<ZoneRegistry>,
    bus: Arc<dyn InterEngineBus>,
    players: Arc<dyn PlayerRepo>,
    items: Arc<dyn ItemRepo>,
    outbound: Arc<dyn OutboundPort>,
    clock: Arc<dyn ClockPort>,
    is_room_local: RoomLocality,
    config: HandoffConfig,
    in_transit: Mutex<HashMap<SessionId, TransitRecord>>,
    next_attempt: AtomicU64,
    /// Serializes the presence check and restore of inbound players.
    admitting: Mutex<()>,
}

impl HandoffManager {
    pub fn new(
        engine_id: EngineId,
        registry: Arc<ZoneRegistry>,
        bus: Arc<dyn InterEngineBus>,
        players: Arc<dyn PlayerRepo>,
        items: Arc<dyn ItemRepo>,
        outbound: Arc<dyn OutboundPort>,
        clock: Arc<dyn ClockPort>,
        is_room_local: RoomLocality,
        config: HandoffConfig,
    ) -> Self {
        Self {
            engine_id,
            registry,
            bus,
            players,
            items,
            outbound,
            clock,
            is_room_local,
            config,
            in_transit: Mutex::new(HashMap::new()),
            next_attempt: AtomicU64::new(0),
            admitting: Mutex::new(()),
        }
    }

    pub fn engine_id(&self) -> &EngineId {
        &self.engine_id
    }

    /// Start moving a local player to the engine that owns `target_room_id`.
    ///
    /// On `Initiated` the player stays fully playable here until the ack
    /// arrives. A repo or bus error leaves no transit record behind.
    pub async fn initiate_handoff(
        &self,
        session_id: SessionId,
        target_room_id: RoomId,
    ) -> Result<HandoffResult, HandoffError> {
        let Some(player) = self.players.get(session_id).await? else {
            return Ok(HandoffResult::PlayerNotFound);
        };

        let Some(target) = self.registry.owner_of(target_room_id.zone()) else {
            tracing::warn!(
                session_id = %session_id,
                zone = %target_room_id.zone(),
                "No engine owns handoff target zone"
            );
            return Ok(HandoffResult::NoEngineForZone);
        };

        // The record is claimed before publishing so a concurrent initiate for
        // the same session sees it. The lock is not held across the send.
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        {
            let mut in_transit = self.in_transit.lock().await;
            if in_transit.contains_key(&session_id) {
                return Ok(HandoffResult::AlreadyInTransit);
            }
            in_transit.insert(
                session_id,
                TransitRecord {
                    session_id,
                    target: target.clone(),
                    target_room_id: target_room_id.clone(),
                    started_at_ms: self.clock.now_epoch_ms(),
                    attempt,
                },
            );
        }

        if let Err(e) = self.publish_handoff(&player, &target, &target_room_id).await {
            self.release_claim(session_id, attempt).await;
            return Err(e);
        }

        tracing::info!(
            session_id = %session_id,
            engine_id = %self.engine_id,
            target_engine_id = %target.engine_id,
            target_room_id = %target_room_id,
            "Handoff initiated"
        );
        self.outbound
            .emit(OutboundEvent::text(session_id, DEPARTING_TEXT))
            .await;

        Ok(HandoffResult::Initiated)
    }

    async fn publish_handoff(
        &self,
        player: &PlayerState,
        target: &EngineAddress,
        target_room_id: &RoomId,
    ) -> Result<(), HandoffError> {
        let session_id = player.session_id;
        let inventory = self.items.inventory(session_id).await?;
        let equipment = self.items.equipment(session_id).await?;
        let handoff = PlayerHandoff {
            session_id,
            target_room_id: target_room_id.clone(),
            player_state: serialize_player(player, &inventory, &equipment),
            gateway_id: session_id.gateway_id(),
            source_engine_id: self.engine_id.clone(),
        };
        self.bus.send_to(&target.engine_id, handoff.into()).await?;
        Ok(())
    }

    /// Drop the record claimed by `attempt`, unless it has since been replaced.
    async fn release_claim(&self, session_id: SessionId, attempt: u64) {
        let mut in_transit = self.in_transit.lock().await;
        if in_transit
            .get(&session_id)
            .is_some_and(|r| r.attempt == attempt)
        {
            in_transit.remove(&session_id);
        }
    }

    /// Resolve an in-transit session from the target's answer.
    pub async fn handle_ack(&self, ack: HandoffAck) -> Result<AckResult, HandoffError> {
        let session_id = ack.session_id;
        let record = {
            let mut in_transit = self.in_transit.lock().await;
            let expected = in_transit
                .get(&session_id)
                .map(|r| r.target.engine_id.clone());
            match (expected, &ack.target_engine_id) {
                (Some(expected), Some(sender)) if sender != &expected => {
                    tracing::warn!(
                        session_id = %session_id,
                        expected = %expected,
                        sender = %sender,
                        "Ignoring handoff ack from unexpected engine"
                    );
                    None
                }
                (Some(_), _) => in_transit.remove(&session_id),
                (None, _) => None,
            }
        };

        let Some(record) = record else {
            tracing::debug!(session_id = %session_id, "Ack for unknown handoff ignored");
            return Ok(AckResult::Unknown);
        };

        if !ack.success {
            let reason = ack.error_message.unwrap_or_default();
            tracing::warn!(
                session_id = %session_id,
                target_engine_id = %record.target.engine_id,
                reason = %reason,
                "Handoff rejected by target"
            );
            self.outbound
                .emit(OutboundEvent::text(session_id, HELD_BACK_TEXT))
                .await;
            return Ok(AckResult::Failed(reason));
        }

        if let Err(e) = self.release_local(session_id).await {
            tracing::error!(
                session_id = %session_id,
                target_engine_id = %record.target.engine_id,
                error = %e,
                "Failed to release handed-off player, keeping transit record"
            );
            self.in_transit
                .lock()
                .await
                .entry(session_id)
                .or_insert(record);
            return Err(e);
        }
        self.outbound
            .emit(OutboundEvent::redirect(session_id, &record.target))
            .await;

        tracing::info!(
            session_id = %session_id,
            target = %record.target,
            "Handoff completed, session redirected"
        );
        Ok(AckResult::Completed {
            target: record.target,
        })
    }

    async fn release_local(&self, session_id: SessionId) -> Result<(), HandoffError> {
        self.players.remove(session_id).await?;
        self.items.remove_all(session_id).await?;
        Ok(())
    }

    /// Drop transit records that waited at least the ack timeout.
    ///
    /// Players are kept; an expired handoff is treated as a failure.
    pub async fn expire_timed_out(&self) -> Vec<ExpiredHandoff> {
        let now = self.clock.now_epoch_ms();
        let mut in_transit = self.in_transit.lock().await;

        let mut expired_ids: Vec<SessionId> = in_transit
            .values()
            .filter(|r| now - r.started_at_ms >= self.config.ack_timeout_ms)
            .map(|r| r.session_id)
            .collect();
        expired_ids.sort();

        let expired: Vec<ExpiredHandoff> = expired_ids
            .into_iter()
            .filter_map(|id| in_transit.remove(&id))
            .map(|record| ExpiredHandoff {
                age_ms: now - record.started_at_ms,
                session_id: record.session_id,
                target_engine_id: record.target.engine_id,
                target_room_id: record.target_room_id,
            })
            .collect();
        drop(in_transit);

        for handoff in &expired {
            tracing::warn!(
                session_id = %handoff.session_id,
                target_engine_id = %handoff.target_engine_id,
                age_ms = handoff.age_ms,
                "Handoff ack timed out"
            );
        }
        expired
    }

    pub async fn is_in_transit(&self, session_id: SessionId) -> bool {
        self.in_transit.lock().await.contains_key(&session_id)
    }

    pub async fn in_transit_count(&self) -> usize {
        self.in_transit.lock().await.len()
    }

    /// Take over a player sent by another engine.
    ///
    /// Returns the session id on success. Rejections are answered with a
    /// negative ack and return `None`. A session already present here is
    /// never overwritten.
    pub async fn accept_handoff(
        &self,
        handoff: PlayerHandoff,
    ) -> Result<Option<SessionId>, HandoffError> {
        let session_id = handoff.session_id;
        let source = handoff.source_engine_id.clone();

        if !(self.is_room_local)(&handoff.target_room_id) {
            return self.reject(&source, session_id, REJECT_ROOM_NOT_LOCAL).await;
        }
        if handoff.player_state.session_id != session_id {
            return self.reject(&source, session_id, REJECT_SESSION_MISMATCH).await;
        }

        let room_id = {
            let admitting = self.admitting.lock().await;
            if self.players.get(session_id).await?.is_some() {
                drop(admitting);
                return self.reject(&source, session_id, REJECT_SESSION_PRESENT).await;
            }
            let restored = deserialize_player(handoff.player_state, handoff.target_room_id);
            let room_id = restored.player.room_id.clone();
            self.players.save(&restored.player).await?;
            self.items
                .restore(session_id, restored.inventory, restored.equipment)
                .await?;
            room_id
        };

        let ack = HandoffAck::accepted(session_id, self.engine_id.clone());
        if let Err(e) = self.bus.send_to(&source, ack.into()).await {
            // Without the ack the source keeps the player; do not keep a copy.
            self.players.remove(session_id).await?;
            self.items.remove_all(session_id).await?;
            return Err(e.into());
        }

        tracing::info!(
            session_id = %session_id,
            engine_id = %self.engine_id,
            source_engine_id = %source,
            room_id = %room_id,
            "Handoff accepted"
        );
        Ok(Some(session_id))
    }

    async fn reject(
        &self,
        source: &EngineId,
        session_id: SessionId,
        reason: &str,
    ) -> Result<Option<SessionId>, HandoffError> {
        tracing::warn!(
            session_id = %session_id,
            engine_id = %self.engine_id,
            source_engine_id = %source,
            reason,
            "Handoff rejected"
        );
        let ack = HandoffAck::rejected(session_id, self.engine_id.clone(), reason);
        self.bus.send_to(source, ack.into()).await?;
        Ok(None)
    }
}
