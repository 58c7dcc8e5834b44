//! mudmesh Engine - Main entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mudmesh_engine::app::Cluster;
use mudmesh_engine::infrastructure::app_settings::{AppSettings, TopologyFile};
use mudmesh_engine::infrastructure::clock::SystemClock;
use mudmesh_engine::infrastructure::outbound::ChannelOutbound;
use mudmesh_engine::infrastructure::ports::OutboundEvent;

const OUTBOUND_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the binary may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mudmesh_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting mudmesh Engine");

    let settings = AppSettings::from_env()?;
    let topology = TopologyFile::load(&settings.topology_path)?;
    tracing::info!(
        path = %settings.topology_path.display(),
        engines = topology.engines.len(),
        mode = %topology.mode,
        "Loaded topology"
    );

    // Session traffic has no gateway in this process; log what would be sent.
    let (outbound, mut events) = ChannelOutbound::channel(OUTBOUND_CAPACITY);
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                OutboundEvent::SendText { session_id, text } => {
                    tracing::info!(session_id = %session_id, text = %text, "Outbound text");
                }
                OutboundEvent::SessionRedirect {
                    session_id,
                    engine_id,
                    host,
                    port,
                } => {
                    tracing::info!(
                        session_id = %session_id,
                        engine_id = %engine_id,
                        host = %host,
                        port,
                        "Outbound session redirect"
                    );
                }
            }
        }
    });

    let mut cluster = Cluster::build(
        settings,
        &topology,
        Arc::new(SystemClock::new()),
        Arc::new(outbound),
    )?;
    cluster.start_default().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    cluster.shutdown().await;
    outbound_task.abort();

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
