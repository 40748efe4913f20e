//! Full session against the in-memory adapters: load, mutate, tick the
//! world, and shut down with a final flush.
//!
//! Run with `RUST_LOG=debug` to watch the save scheduler and merge
//! filter at work.

use std::sync::Arc;

use emberfall_client::config::SessionConfig;
use emberfall_client::infrastructure::clock::{SystemClock, SystemRandom};
use emberfall_client::infrastructure::testing::{
    InMemoryPersistence, LevelScore, ManualPushChannel,
};
use emberfall_client::Session;
use emberfall_domain::{Hero, HeroClass, PlayerId, WorldMap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());

    let session = Session::new(
        player,
        Arc::clone(&persistence) as Arc<_>,
        Arc::clone(&push) as Arc<_>,
        Arc::new(LevelScore),
        Arc::new(SystemClock),
        Arc::new(SystemRandom),
        SessionConfig::from_env(),
    );

    let snapshot = session.start().await?;
    tracing::info!(heroes = snapshot.heroes.len(), "initial load complete");

    session.actions().add_gold(250).await;
    let snap = session
        .actions()
        .add_hero(Hero::new("Tessa", HeroClass::Rogue))
        .await?;
    let ids: Vec<_> = snap.heroes.iter().map(|h| h.id).collect();
    session.actions().set_active_party(ids).await;

    let snap = session.actions().update_world_map(WorldMap::new(16, 16)).await;
    tracing::info!(
        combat_power = snap.combat_power,
        world_objects = snap.world_objects.len(),
        "session state after world install"
    );

    session.shutdown().await;
    tracing::info!(writes = persistence.write_count(), "shut down, all flushed");
    Ok(())
}
