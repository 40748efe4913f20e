//! In-memory adapters for integration tests and demos.
//!
//! These are real (if simplistic) implementations of the ports, not
//! mocks: the persistence store keeps whole records per player and the
//! push channel delivers payloads synchronously to the registered
//! callback. They live in the library proper so integration tests and
//! examples can share them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use emberfall_domain::{Hero, PlayerId};
use emberfall_protocol::{HeroRecord, ItemRecord, ProfileRecord};

use crate::infrastructure::ports::{
    HeroScorePort, PersistError, PersistencePort, PushCallback, PushChannelPort, PushError,
};

/// Map-backed persistence with last-write-wins records and an outage
/// switch for failure-path tests.
#[derive(Default)]
pub struct InMemoryPersistence {
    profiles: Mutex<HashMap<Uuid, ProfileRecord>>,
    rosters: Mutex<HashMap<Uuid, Vec<HeroRecord>>>,
    inventories: Mutex<HashMap<Uuid, Vec<ItemRecord>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    write_count: AtomicUsize,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a transport error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read fail with a transport error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls (profile, roster, inventory each
    /// count separately).
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Seed a profile directly, bypassing the port.
    pub fn seed_profile(&self, profile: ProfileRecord) {
        self.profiles
            .lock()
            .expect("profiles lock poisoned")
            .insert(profile.player_id, profile);
    }

    /// Seed a roster directly, bypassing the port.
    pub fn seed_roster(&self, player: PlayerId, roster: Vec<HeroRecord>) {
        self.rosters
            .lock()
            .expect("rosters lock poisoned")
            .insert(player.to_uuid(), roster);
    }

    pub fn stored_profile(&self, player: PlayerId) -> Option<ProfileRecord> {
        self.profiles
            .lock()
            .expect("profiles lock poisoned")
            .get(&player.to_uuid())
            .cloned()
    }

    pub fn stored_roster(&self, player: PlayerId) -> Vec<HeroRecord> {
        self.rosters
            .lock()
            .expect("rosters lock poisoned")
            .get(&player.to_uuid())
            .cloned()
            .unwrap_or_default()
    }

    fn check_write(&self) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Transport("simulated outage".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), PersistError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistError::Transport("simulated outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn get_or_create_profile(&self, player: PlayerId) -> Result<ProfileRecord, PersistError> {
        self.check_read()?;
        let mut profiles = self.profiles.lock().expect("profiles lock poisoned");
        Ok(profiles
            .entry(player.to_uuid())
            .or_insert_with(|| ProfileRecord::new(player.to_uuid(), Utc::now()))
            .clone())
    }

    async fn get_roster(&self, player: PlayerId) -> Result<Vec<HeroRecord>, PersistError> {
        self.check_read()?;
        Ok(self.stored_roster(player))
    }

    async fn put_profile(
        &self,
        player: PlayerId,
        profile: &ProfileRecord,
    ) -> Result<(), PersistError> {
        self.check_write()?;
        self.profiles
            .lock()
            .expect("profiles lock poisoned")
            .insert(player.to_uuid(), profile.clone());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn put_roster(
        &self,
        player: PlayerId,
        heroes: &[HeroRecord],
    ) -> Result<Vec<HeroRecord>, PersistError> {
        self.check_write()?;
        self.rosters
            .lock()
            .expect("rosters lock poisoned")
            .insert(player.to_uuid(), heroes.to_vec());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(heroes.to_vec())
    }

    async fn put_inventory(
        &self,
        player: PlayerId,
        items: &[ItemRecord],
    ) -> Result<(), PersistError> {
        self.check_write()?;
        self.inventories
            .lock()
            .expect("inventories lock poisoned")
            .insert(player.to_uuid(), items.to_vec());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Push channel driven by hand: tests call [`ManualPushChannel::emit`]
/// to deliver a payload to the subscriber.
#[derive(Default)]
pub struct ManualPushChannel {
    callbacks: Mutex<HashMap<Uuid, PushCallback>>,
}

impl ManualPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a payload to the player's subscriber. Returns false when
    /// nobody is subscribed.
    pub fn emit(&self, player: PlayerId, payload: ProfileRecord) -> bool {
        let callbacks = self.callbacks.lock().expect("callbacks lock poisoned");
        match callbacks.get(&player.to_uuid()) {
            Some(callback) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, player: PlayerId) -> bool {
        self.callbacks
            .lock()
            .expect("callbacks lock poisoned")
            .contains_key(&player.to_uuid())
    }
}

impl PushChannelPort for ManualPushChannel {
    fn subscribe(&self, player: PlayerId, on_change: PushCallback) -> Result<(), PushError> {
        let mut callbacks = self.callbacks.lock().expect("callbacks lock poisoned");
        if callbacks.contains_key(&player.to_uuid()) {
            return Err(PushError::AlreadySubscribed);
        }
        callbacks.insert(player.to_uuid(), on_change);
        Ok(())
    }

    fn unsubscribe(&self, player: PlayerId) {
        self.callbacks
            .lock()
            .expect("callbacks lock poisoned")
            .remove(&player.to_uuid());
    }
}

/// Stand-in combat scorer: level weight plus raw stats.
pub struct LevelScore;

impl HeroScorePort for LevelScore {
    fn score(&self, hero: &Hero) -> u64 {
        hero.level as u64 * 10
            + (hero.stats.attack + hero.stats.defense + hero.stats.speed) as u64
    }
}
