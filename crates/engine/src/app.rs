//! Application state and composition.
//!
//! An [`EngineNode`] is one engine: its registries, its bus endpoint and the
//! use cases that run on it. A [`Cluster`] wires every engine named in the
//! topology into one process over the configured bus and owns the background
//! tasks (bus listeners, handoff sweepers, load reporters, the scaler).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mudmesh_domain::{EngineAddress, EngineId, RoomId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::BusListener;
use crate::infrastructure::app_settings::{AppSettings, BusMode, ConfigError, TopologyFile};
use crate::infrastructure::bus::{
    DistributedBus, EnvelopeSigner, InProcessBus, LocalBusHub, LocalPubSub, SigningError,
};
use crate::infrastructure::in_memory::{InMemoryItemRepo, InMemoryPlayerRepo};
use crate::infrastructure::ports::{
    BusError, ClockPort, InterEngineBus, ItemRepo, OutboundPort, PlayerRepo, PubSubTransport,
    ScaleActuator,
};
use crate::stores::{TopologyError, ZoneRegistry};
use crate::use_cases;
use crate::use_cases::handoff::{HandoffConfig, HandoffManager, RoomLocality};
use crate::use_cases::scaling::{LoggingActuator, ThresholdInstanceScaler};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
    #[error("Bus signing error: {0}")]
    Signing(#[from] SigningError),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// How often a node's background tasks run.
#[derive(Debug, Clone, Copy)]
pub struct NodeIntervals {
    pub sweep: Duration,
    pub load_report: Duration,
}

/// Container for one engine's use cases.
pub struct UseCases {
    pub handoff: Arc<HandoffManager>,
    pub move_player: Arc<use_cases::MovePlayer>,
    pub sweep_expired: Arc<use_cases::SweepExpiredHandoffs>,
    pub report_load: Arc<use_cases::ReportZoneLoad>,
}

/// One engine and everything it owns.
pub struct EngineNode {
    pub address: EngineAddress,
    pub registry: Arc<ZoneRegistry>,
    pub bus: Arc<dyn InterEngineBus>,
    pub players: Arc<dyn PlayerRepo>,
    pub items: Arc<dyn ItemRepo>,
    pub use_cases: UseCases,
}

impl EngineNode {
    pub fn new(
        address: EngineAddress,
        registry: Arc<ZoneRegistry>,
        bus: Arc<dyn InterEngineBus>,
        players: Arc<dyn PlayerRepo>,
        items: Arc<dyn ItemRepo>,
        outbound: Arc<dyn OutboundPort>,
        clock: Arc<dyn ClockPort>,
        handoff_config: HandoffConfig,
    ) -> Self {
        let engine_id = address.engine_id.clone();
        let is_room_local = room_locality(registry.clone(), engine_id.clone());

        let handoff = Arc::new(HandoffManager::new(
            engine_id.clone(),
            registry.clone(),
            bus.clone(),
            players.clone(),
            items.clone(),
            outbound.clone(),
            clock.clone(),
            is_room_local.clone(),
            handoff_config,
        ));
        let use_cases = UseCases {
            move_player: Arc::new(use_cases::MovePlayer::new(
                players.clone(),
                handoff.clone(),
                is_room_local,
                clock,
            )),
            sweep_expired: Arc::new(use_cases::SweepExpiredHandoffs::new(
                handoff.clone(),
                outbound,
            )),
            report_load: Arc::new(use_cases::ReportZoneLoad::new(
                engine_id,
                registry.clone(),
                players.clone(),
            )),
            handoff,
        };

        Self {
            address,
            registry,
            bus,
            players,
            items,
            use_cases,
        }
    }

    pub fn engine_id(&self) -> &EngineId {
        &self.address.engine_id
    }

    /// Start the bus endpoint and spawn the listener, sweeper and load
    /// reporter. Tasks stop when `cancel` fires.
    pub async fn start(
        &self,
        intervals: NodeIntervals,
        cancel: CancellationToken,
    ) -> Result<Vec<JoinHandle<()>>, BusError> {
        self.bus.start().await?;
        let incoming = self.bus.incoming().await.ok_or(BusError::Closed)?;

        let listener = BusListener::new(self.use_cases.handoff.clone());
        let listener_cancel = cancel.clone();
        let mut tasks = vec![tokio::spawn(async move {
            listener.run(incoming, listener_cancel).await;
        })];

        let sweep = self.use_cases.sweep_expired.clone();
        tasks.push(spawn_periodic(intervals.sweep, cancel.clone(), move || {
            let sweep = sweep.clone();
            async move {
                sweep.execute().await;
            }
        }));

        let report = self.use_cases.report_load.clone();
        let engine_id = self.engine_id().clone();
        tasks.push(spawn_periodic(intervals.load_report, cancel, move || {
            let report = report.clone();
            let engine_id = engine_id.clone();
            async move {
                if let Err(e) = report.execute().await {
                    tracing::warn!(engine_id = %engine_id, error = %e, "Load report failed");
                }
            }
        }));

        tracing::info!(
            engine_id = %self.address.engine_id,
            address = %self.address,
            zones = ?self.registry.zones_of(&self.address.engine_id),
            "Engine node started"
        );
        Ok(tasks)
    }
}

/// Rooms are local when this engine is the first claimant of their zone.
fn room_locality(registry: Arc<ZoneRegistry>, engine_id: EngineId) -> RoomLocality {
    Arc::new(move |room: &RoomId| registry.is_local(room.zone(), &engine_id))
}

/// Run `task` every `period` until cancelled.
fn spawn_periodic<F, Fut>(period: Duration, cancel: CancellationToken, task: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => task().await,
            }
        }
    })
}

/// Every engine of the topology running in this process.
pub struct Cluster {
    pub registry: Arc<ZoneRegistry>,
    pub nodes: Vec<Arc<EngineNode>>,
    pub scaler: Arc<ThresholdInstanceScaler>,
    settings: AppSettings,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Cluster {
    /// Wire one node per topology entry, each with in-memory registries and
    /// its own endpoint on the configured bus.
    pub fn build(
        settings: AppSettings,
        topology: &TopologyFile,
        clock: Arc<dyn ClockPort>,
        outbound: Arc<dyn OutboundPort>,
    ) -> Result<Self, AppError> {
        let registry = Arc::new(ZoneRegistry::new(topology.mode, topology.assignments())?);
        let bus_for = bus_factory(&settings)?;

        let nodes = registry
            .engines()
            .into_iter()
            .map(|address| {
                let bus = bus_for(address.engine_id.clone());
                Arc::new(EngineNode::new(
                    address,
                    registry.clone(),
                    bus,
                    Arc::new(InMemoryPlayerRepo::new()),
                    Arc::new(InMemoryItemRepo::new()),
                    outbound.clone(),
                    clock.clone(),
                    settings.handoff,
                ))
            })
            .collect();

        let scaler = Arc::new(ThresholdInstanceScaler::new(
            registry.clone(),
            clock,
            settings.scaling.clone(),
        ));

        Ok(Self {
            registry,
            nodes,
            scaler,
            settings,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub fn node(&self, engine_id: &EngineId) -> Option<&Arc<EngineNode>> {
        self.nodes.iter().find(|n| n.engine_id() == engine_id)
    }

    /// Start every node, then the scaler with `actuator`.
    pub async fn start(&mut self, actuator: Arc<dyn ScaleActuator>) -> Result<(), AppError> {
        let intervals = NodeIntervals {
            sweep: self.settings.sweep_interval,
            load_report: self.settings.load_report_interval,
        };
        for node in &self.nodes {
            let tasks = node.start(intervals, self.cancel.child_token()).await?;
            self.tasks.extend(tasks);
        }

        self.tasks.push(tokio::spawn(use_cases::run_scaler(
            self.scaler.clone(),
            actuator,
            self.settings.scaler_interval,
            self.cancel.child_token(),
        )));

        tracing::info!(
            engines = self.nodes.len(),
            mode = %self.registry.mode(),
            bus = %self.settings.bus.mode,
            "Cluster started"
        );
        Ok(())
    }

    /// Start with the default logging actuator.
    pub async fn start_default(&mut self) -> Result<(), AppError> {
        self.start(Arc::new(LoggingActuator)).await
    }

    /// Stop background tasks and close every bus endpoint. Handoffs still in
    /// transit are dropped; their players stay on the source engine.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for node in &self.nodes {
            node.bus.close().await;
        }
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
        tracing::info!("Cluster stopped");
    }
}

type BusFactory = Box<dyn Fn(EngineId) -> Arc<dyn InterEngineBus>>;

fn bus_factory(settings: &AppSettings) -> Result<BusFactory, AppError> {
    let capacity = settings.bus.capacity;
    match settings.bus.mode {
        BusMode::InProcess => {
            let hub = LocalBusHub::new();
            Ok(Box::new(move |engine_id| {
                let bus = InProcessBus::new(hub.clone(), engine_id, capacity);
                Arc::new(bus) as Arc<dyn InterEngineBus>
            }))
        }
        BusMode::Distributed => {
            let secret = settings
                .bus
                .secret
                .clone()
                .ok_or(ConfigError::MissingBusSecret)?;
            let signer = EnvelopeSigner::new(secret.into_bytes())?;
            let transport: Arc<dyn PubSubTransport> = Arc::new(LocalPubSub::new(capacity));
            let prefix = settings.bus.channel_prefix.clone();
            Ok(Box::new(move |engine_id| {
                let bus = DistributedBus::new(
                    engine_id,
                    transport.clone(),
                    signer.clone(),
                    prefix.clone(),
                    capacity,
                );
                Arc::new(bus) as Arc<dyn InterEngineBus>
            }))
        }
    }
}
