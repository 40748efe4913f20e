//! End-to-end session flow against the in-memory adapters: load paths,
//! debounced persistence, push-channel merging, and the world ticker,
//! wired exactly as a real session would be.

use std::sync::Arc;

use chrono::Utc;
use std::time::Duration;

use emberfall_client::config::SessionConfig;
use emberfall_client::infrastructure::clock::{SystemClock, SystemRandom};
use emberfall_client::infrastructure::ports::{PersistencePort, PushChannelPort};
use emberfall_client::infrastructure::testing::{
    InMemoryPersistence, LevelScore, ManualPushChannel,
};
use emberfall_client::use_cases::save_scheduler::SyncStatus;
use emberfall_client::Session;
use emberfall_domain::{AccountTier, PlayerId, WorldMap};
use emberfall_protocol::ProfileRecord;

fn build_session(
    player: PlayerId,
    persistence: &Arc<InMemoryPersistence>,
    push: &Arc<ManualPushChannel>,
) -> Arc<Session> {
    Session::new(
        player,
        Arc::clone(persistence) as Arc<dyn PersistencePort>,
        Arc::clone(push) as Arc<dyn PushChannelPort>,
        Arc::new(LevelScore),
        Arc::new(SystemClock),
        Arc::new(SystemRandom),
        SessionConfig::default(),
    )
}

/// Let spawned tasks (push pump, debounce timers) run to completion
/// under paused time.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn fresh_player_gets_starter_roster_and_autosaves_mutations() {
    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());
    let session = build_session(player, &persistence, &push);

    let snapshot = session.start().await.expect("start");
    assert_eq!(snapshot.heroes.len(), 4);
    assert!(!snapshot.loading);
    assert!(push.is_subscribed(player));
    // The load itself is not a local mutation; nothing is flushed yet.
    assert_eq!(persistence.write_count(), 0);

    session.actions().add_gold(100).await;
    settle().await;

    assert_eq!(session.sync_state().status, SyncStatus::Success);
    let stored = persistence.stored_profile(player).expect("stored profile");
    assert_eq!(stored.gold, 100);
    assert_eq!(persistence.stored_roster(player).len(), 4);

    session.shutdown().await;
    assert!(!push.is_subscribed(player));
}

#[tokio::test(start_paused = true)]
async fn push_payload_updates_remote_fields_and_leaves_roster_alone() {
    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());
    let session = build_session(player, &persistence, &push);
    session.start().await.expect("start");

    let mut payload = ProfileRecord::new(player.to_uuid(), Utc::now());
    payload.gold = 777;
    payload.tier = AccountTier::Silver;
    payload.max_energy = 9_000; // cached copy, must be recomputed instead
    assert!(push.emit(player, payload));
    settle().await;

    let snap = session.snapshot().await;
    assert_eq!(snap.resources.gold, 777);
    assert_eq!(snap.tier, AccountTier::Silver);
    assert_eq!(snap.resources.max_energy, 120);
    assert_eq!(snap.heroes.len(), 4);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn second_session_restores_what_the_first_persisted() {
    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());

    let first = build_session(player, &persistence, &push);
    let snapshot = first.start().await.expect("first start");
    let ids: Vec<_> = snapshot.heroes.iter().map(|h| h.id).collect();
    first.actions().add_gold(50).await;
    first.actions().set_active_party(vec![ids[2], ids[0]]).await;
    first.shutdown().await; // final flush

    let second = build_session(player, &persistence, &push);
    let restored = second.start().await.expect("second start");
    assert_eq!(restored.resources.gold, 50);
    assert_eq!(restored.heroes.len(), 4);
    // Party order comes back from the persisted ordinals.
    assert_eq!(restored.party.ids(), &[ids[2], ids[0]][..]);
    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn world_install_populates_objects_and_persists_them() {
    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());
    let session = build_session(player, &persistence, &push);
    session.start().await.expect("start");

    let snap = session
        .actions()
        .update_world_map(WorldMap::new(16, 16))
        .await;
    assert_eq!(snap.world_objects.len(), 12);

    settle().await;
    let stored = persistence.stored_profile(player).expect("stored profile");
    assert_eq!(stored.world_objects.len(), 12);
    assert!(stored.world_map.is_some());

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn outage_surfaces_error_status_and_manual_save_recovers() {
    let player = PlayerId::new();
    let persistence = Arc::new(InMemoryPersistence::new());
    let push = Arc::new(ManualPushChannel::new());
    let session = build_session(player, &persistence, &push);
    session.start().await.expect("start");

    persistence.set_fail_writes(true);
    session.actions().add_gold(10).await;
    settle().await;
    let state = session.sync_state();
    assert_eq!(state.status, SyncStatus::Error);
    assert!(state.last_error.is_some());
    // The profile created at load time is untouched by the failed flush.
    assert_eq!(
        persistence.stored_profile(player).expect("profile").gold,
        0
    );

    persistence.set_fail_writes(false);
    session.actions().save().await;
    assert_eq!(session.sync_state().status, SyncStatus::Success);
    assert_eq!(
        persistence.stored_profile(player).expect("profile").gold,
        10
    );

    session.shutdown().await;
}
