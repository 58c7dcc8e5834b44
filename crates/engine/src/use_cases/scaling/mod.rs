//! Instance scaling use cases.
//!
//! The policy ([`ThresholdInstanceScaler`]) only produces [`ScaleDecision`]s;
//! a [`ScaleActuator`] decides what to do with them.

mod threshold;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mudmesh_domain::ScaleDecision;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::{ScaleActuator, ScaleError};

pub use threshold::{ScalingConfig, ThresholdInstanceScaler};

/// Actuator that only records decisions in the log.
#[derive(Debug, Default)]
pub struct LoggingActuator;

#[async_trait]
impl ScaleActuator for LoggingActuator {
    async fn apply(&self, decision: &ScaleDecision) -> Result<(), ScaleError> {
        match decision {
            ScaleDecision::ScaleUp { zone } => {
                tracing::info!(zone = %zone, "Scale up recommended");
            }
            ScaleDecision::ScaleDown { zone, engine_id } => {
                tracing::info!(zone = %zone, engine_id = %engine_id, "Scale down recommended");
            }
        }
        Ok(())
    }
}

/// Evaluate on every tick and hand decisions to `actuator` until cancelled.
pub async fn run_scaler(
    scaler: Arc<ThresholdInstanceScaler>,
    actuator: Arc<dyn ScaleActuator>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                for decision in scaler.evaluate() {
                    if let Err(e) = actuator.apply(&decision).await {
                        tracing::warn!(
                            error = %e,
                            zone = %decision.zone(),
                            "Scale actuator rejected decision"
                        );
                    }
                }
            }
        }
    }

    tracing::debug!("Scaler loop stopped");
}
