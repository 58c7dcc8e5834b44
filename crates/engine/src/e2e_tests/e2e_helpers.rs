//! Helpers for standing up a cluster and waiting on its asynchronous effects.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mudmesh_domain::{
    GatewayId, Item, ItemSlot, PlayerState, SessionId, SessionIdFactory, ZoneMode,
};

use crate::app::{Cluster, EngineNode};
use crate::infrastructure::app_settings::{AppSettings, BusMode, EngineEntry, TopologyFile};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::ports::{ClockPort, ItemRepo, PlayerRepo};
use crate::test_fixtures::{engine, room, RecordingOutbound};

pub const TEST_SECRET: &str = "e2e-shared-secret";

/// engine-a owns `town`, engine-b owns `forest`.
pub fn town_and_forest() -> TopologyFile {
    TopologyFile {
        mode: ZoneMode::Classic,
        engines: vec![
            EngineEntry {
                engine_id: engine("engine-a"),
                host: "127.0.0.1".to_string(),
                port: 7001,
                zones: vec!["town".to_string()],
            },
            EngineEntry {
                engine_id: engine("engine-b"),
                host: "127.0.0.1".to_string(),
                port: 7002,
                zones: vec!["forest".to_string()],
            },
        ],
    }
}

/// Fast background intervals so expiry and load reports show up quickly.
pub fn fast_settings(mode: BusMode) -> AppSettings {
    let mut settings = AppSettings::default();
    settings.bus.mode = mode;
    if mode == BusMode::Distributed {
        settings.bus.secret = Some(TEST_SECRET.to_string());
    }
    settings.sweep_interval = Duration::from_millis(20);
    settings.load_report_interval = Duration::from_millis(20);
    settings.scaler_interval = Duration::from_millis(50);
    settings
}

pub struct TestCluster {
    pub cluster: Cluster,
    pub outbound: Arc<RecordingOutbound>,
}

impl TestCluster {
    pub async fn start(settings: AppSettings, topology: &TopologyFile) -> Self {
        let outbound = Arc::new(RecordingOutbound::new());
        let mut cluster = Cluster::build(
            settings,
            topology,
            Arc::new(SystemClock::new()),
            outbound.clone(),
        )
        .expect("cluster builds");
        cluster.start_default().await.expect("cluster starts");
        Self { cluster, outbound }
    }

    pub fn node(&self, id: &str) -> Arc<EngineNode> {
        self.cluster
            .node(&engine(id))
            .cloned()
            .expect("engine in topology")
    }

    pub async fn shutdown(self) {
        self.cluster.shutdown().await;
    }
}

/// A level-5 adventurer in the town square carrying a coin, a sword and a
/// shield.
pub async fn seed_adventurer(node: &EngineNode, session_id: SessionId) {
    let mut player = PlayerState::new(session_id, "Rowan", room("town:square"), 0);
    player.hp = 15;
    player.max_hp = 20;
    player.level = 5;
    player.xp_total = 25_000;
    node.players.save(&player).await.expect("save player");

    let coin = Item::new("item:coin", "coin", "a gold coin");
    let sword = Item::new("item:sword", "sword", "a short sword")
        .with_slot(ItemSlot::Hand)
        .with_damage(5);
    let shield = Item::new("item:shield", "shield", "a round shield")
        .with_slot(ItemSlot::OffHand)
        .with_armor(2);
    node.items
        .restore(
            session_id,
            vec![coin],
            [(ItemSlot::Hand, sword), (ItemSlot::OffHand, shield)]
                .into_iter()
                .collect(),
        )
        .await
        .expect("restore items");
}

/// `count` fresh session ids from `gateway`, allocated the way a gateway
/// numbers new connections.
pub fn allocate_sessions(gateway: u16, count: usize) -> Vec<SessionId> {
    let factory = SessionIdFactory::new(GatewayId::new(gateway)).expect("valid gateway id");
    let now = SystemClock::new().now_epoch_ms();
    (0..count).map(|_| factory.next_id(now)).collect()
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
