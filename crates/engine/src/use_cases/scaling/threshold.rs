//! Utilization-threshold scaling policy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use mudmesh_domain::ScaleDecision;

use crate::infrastructure::ports::ClockPort;
use crate::stores::ZoneRegistry;

/// Tunables for [`ThresholdInstanceScaler`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingConfig {
    /// Players one engine instance is expected to carry for a zone.
    pub per_instance_capacity: u32,
    pub scale_up_threshold: f64,
    pub scale_down_threshold: f64,
    pub cooldown_ms: i64,
    pub default_min_instances: usize,
    /// Per-zone instance floors; the larger of this and the default applies.
    pub min_instances: HashMap<String, usize>,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            per_instance_capacity: 200,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.2,
            cooldown_ms: 60_000,
            default_min_instances: 1,
            min_instances: HashMap::new(),
        }
    }
}

impl ScalingConfig {
    fn floor_for(&self, zone: &str) -> usize {
        self.min_instances
            .get(zone)
            .copied()
            .unwrap_or(0)
            .max(self.default_min_instances)
    }
}

/// Recommends scale-up and scale-down actions from reported zone loads.
///
/// Holds no state besides the time of the last emitted decision, which
/// drives a global cooldown.
pub struct ThresholdInstanceScaler {
    registry: Arc<ZoneRegistry>,
    clock: Arc<dyn ClockPort>,
    config: ScalingConfig,
    last_decision_ms: Mutex<Option<i64>>,
}

impl ThresholdInstanceScaler {
    pub fn new(registry: Arc<ZoneRegistry>, clock: Arc<dyn ClockPort>, config: ScalingConfig) -> Self {
        Self {
            registry,
            clock,
            config,
            last_decision_ms: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    /// Evaluate every zone once.
    ///
    /// Returns nothing while a previous decision's cooldown is running.
    pub fn evaluate(&self) -> Vec<ScaleDecision> {
        let now = self.clock.now_epoch_ms();
        let mut last = self
            .last_decision_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = *last {
            if now - previous < self.config.cooldown_ms {
                return Vec::new();
            }
        }

        let decisions: Vec<ScaleDecision> = self
            .registry
            .zones()
            .into_iter()
            .filter_map(|zone| self.evaluate_zone(zone))
            .collect();

        if !decisions.is_empty() {
            *last = Some(now);
            tracing::info!(
                decisions = decisions.len(),
                cooldown_ms = self.config.cooldown_ms,
                "Scaler emitted decisions"
            );
        }
        decisions
    }

    fn evaluate_zone(&self, zone: String) -> Option<ScaleDecision> {
        let instances = self.registry.instances_of(&zone);
        if instances.is_empty() || self.config.per_instance_capacity == 0 {
            return None;
        }

        let capacity = instances.len() as f64 * f64::from(self.config.per_instance_capacity);
        let load: u64 = instances.iter().map(|i| u64::from(i.player_count)).sum();
        let utilization = load as f64 / capacity;

        if utilization > self.config.scale_up_threshold {
            tracing::debug!(zone = %zone, utilization, "Zone above scale-up threshold");
            return Some(ScaleDecision::ScaleUp { zone });
        }

        if utilization < self.config.scale_down_threshold
            && instances.len() > self.config.floor_for(&zone)
        {
            // min_by_key keeps the first of equal minimums.
            let least_loaded = instances.iter().min_by_key(|i| i.player_count)?;
            tracing::debug!(
                zone = %zone,
                utilization,
                engine_id = %least_loaded.engine_id,
                "Zone below scale-down threshold"
            );
            return Some(ScaleDecision::ScaleDown {
                engine_id: least_loaded.engine_id.clone(),
                zone,
            });
        }

        None
    }
}
