//! Periodic per-engine housekeeping: expiring unanswered handoffs and
//! reporting zone load.

use std::collections::HashMap;
use std::sync::Arc;

use mudmesh_domain::EngineId;

use crate::infrastructure::ports::{OutboundEvent, OutboundPort, PlayerRepo, RepoError};
use crate::stores::ZoneRegistry;
use crate::use_cases::handoff::{ExpiredHandoff, HandoffManager};

pub(crate) const CROSSING_FAILED_TEXT: &str = "The way ahead fades before you can pass. You remain here.";

/// Expire handoffs whose ack never came and tell the affected players.
pub struct SweepExpiredHandoffs {
    handoff: Arc<HandoffManager>,
    outbound: Arc<dyn OutboundPort>,
}

impl SweepExpiredHandoffs {
    pub fn new(handoff: Arc<HandoffManager>, outbound: Arc<dyn OutboundPort>) -> Self {
        Self { handoff, outbound }
    }

    pub async fn execute(&self) -> Vec<ExpiredHandoff> {
        let expired = self.handoff.expire_timed_out().await;
        for handoff in &expired {
            self.outbound
                .emit(OutboundEvent::text(handoff.session_id, CROSSING_FAILED_TEXT))
                .await;
        }
        expired
    }
}

/// Count local players per claimed zone and publish the counts to the
/// registry.
pub struct ReportZoneLoad {
    engine_id: EngineId,
    registry: Arc<ZoneRegistry>,
    players: Arc<dyn PlayerRepo>,
}

impl ReportZoneLoad {
    pub fn new(engine_id: EngineId, registry: Arc<ZoneRegistry>, players: Arc<dyn PlayerRepo>) -> Self {
        Self {
            engine_id,
            registry,
            players,
        }
    }

    pub async fn execute(&self) -> Result<HashMap<String, u32>, RepoError> {
        // Claimed zones with nobody in them still report zero.
        let mut counts: HashMap<String, u32> = self
            .registry
            .zones_of(&self.engine_id)
            .into_iter()
            .map(|zone| (zone, 0))
            .collect();

        for player in self.players.list().await? {
            if let Some(count) = counts.get_mut(player.zone()) {
                *count += 1;
            }
        }

        self.registry.report_load(&self.engine_id, &counts);
        tracing::debug!(engine_id = %self.engine_id, zones = counts.len(), "Zone load reported");
        Ok(counts)
    }
}
