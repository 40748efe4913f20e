//! Action set exposed to the calling layer (UI, scripting).
//!
//! Every mutation goes through the state store's transform, which takes
//! care of derived-field recomputation and save scheduling; actions only
//! express the domain change and the occasional scheduler interaction
//! (bulk updates, manual saves).

use std::sync::Arc;

use emberfall_domain::{
    ActiveParty, DomainError, Hero, HeroId, InventoryItem, ItemId, PlayerId, Snapshot, WorldMap,
};

use crate::infrastructure::ports::ClockPort;
use crate::stores::StateStore;
use crate::use_cases::load_reconciler::LoadReconciler;
use crate::use_cases::save_scheduler::SaveScheduler;
use crate::use_cases::world_tick::WorldTickService;

/// Per-hero result of an externally resolved combat, applied as one
/// bulk roster mutation.
#[derive(Debug, Clone)]
pub struct HeroCombatUpdate {
    pub hero_id: HeroId,
    pub level: u32,
    pub experience: u64,
    pub required_experience: u64,
    pub talent_points: u32,
    pub hit_points: u32,
}

pub struct GameActions {
    player: PlayerId,
    state: Arc<StateStore>,
    scheduler: Arc<SaveScheduler>,
    reconciler: Arc<LoadReconciler>,
    world_tick: Arc<WorldTickService>,
    clock: Arc<dyn ClockPort>,
}

impl GameActions {
    pub fn new(
        player: PlayerId,
        state: Arc<StateStore>,
        scheduler: Arc<SaveScheduler>,
        reconciler: Arc<LoadReconciler>,
        world_tick: Arc<WorldTickService>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            player,
            state,
            scheduler,
            reconciler,
            world_tick,
            clock,
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.current().await
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    pub async fn add_gold(&self, amount: u64) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.resources.add_gold(amount);
                s
            })
            .await
    }

    pub async fn spend_gold(&self, amount: u64) -> Result<Snapshot, DomainError> {
        let mut outcome = Ok(());
        let snap = self
            .state
            .apply(|mut s| {
                outcome = s.resources.spend_gold(amount);
                s
            })
            .await;
        outcome.map(|()| snap)
    }

    pub async fn add_gems(&self, amount: u64) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.resources.add_gems(amount);
                s
            })
            .await
    }

    pub async fn spend_gems(&self, amount: u64) -> Result<Snapshot, DomainError> {
        let mut outcome = Ok(());
        let snap = self
            .state
            .apply(|mut s| {
                outcome = s.resources.spend_gems(amount);
                s
            })
            .await;
        outcome.map(|()| snap)
    }

    pub async fn add_energy(&self, amount: u32) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.resources.add_energy(amount);
                s
            })
            .await
    }

    pub async fn spend_energy(&self, amount: u32) -> Result<Snapshot, DomainError> {
        let mut outcome = Ok(());
        let snap = self
            .state
            .apply(|mut s| {
                outcome = s.resources.spend_energy(amount);
                s
            })
            .await;
        outcome.map(|()| snap)
    }

    // -------------------------------------------------------------------------
    // Roster and party
    // -------------------------------------------------------------------------

    /// Add a hero; rejected when the roster already holds a hero with
    /// the same (name, class).
    pub async fn add_hero(&self, hero: Hero) -> Result<Snapshot, DomainError> {
        let mut outcome = Ok(());
        let snap = self
            .state
            .apply(|mut s| {
                if s.heroes.iter().any(|h| h.dedup_key() == hero.dedup_key()) {
                    outcome = Err(DomainError::constraint(format!(
                        "roster already has a {} named {}",
                        hero.class.as_str(),
                        hero.name
                    )));
                } else {
                    s.heroes.push(hero);
                }
                s
            })
            .await;
        outcome.map(|()| snap)
    }

    /// Remove a hero from the roster and, if present, the active party.
    pub async fn remove_hero(&self, id: HeroId) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.heroes.retain(|h| h.id != id);
                s.party = s.party.without(id);
                s
            })
            .await
    }

    /// Set the active party. Duplicates, ids outside the roster, and
    /// members beyond the cap are dropped silently.
    pub async fn set_active_party(&self, ids: Vec<HeroId>) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.party = ActiveParty::sanitized(ids, &s.heroes);
                s
            })
            .await
    }

    /// Apply externally resolved combat results as one bulk mutation.
    ///
    /// The bulk timestamp is marked before the transform so the ambient
    /// save notification triggered by it is skipped; the explicit
    /// snapshot notification afterwards is the one that persists.
    pub async fn sync_combat_results(&self, updates: Vec<HeroCombatUpdate>) -> Snapshot {
        self.scheduler.mark_bulk_update();
        let snap = self
            .state
            .apply(move |mut s| {
                for update in updates {
                    match s.hero_mut(update.hero_id) {
                        Some(hero) => {
                            hero.level = update.level;
                            hero.experience = update.experience;
                            hero.required_experience = update.required_experience;
                            hero.talent_points = update.talent_points;
                            hero.hit_points = update.hit_points.min(hero.max_hit_points);
                        }
                        None => {
                            tracing::warn!(
                                hero = %update.hero_id,
                                "combat result for hero not in roster, dropping"
                            );
                        }
                    }
                }
                s
            })
            .await;
        self.scheduler.notify(Some(snap.clone()));
        snap
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    pub async fn add_item(&self, item: InventoryItem) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.inventory.push(item);
                s
            })
            .await
    }

    pub async fn remove_item(&self, id: ItemId) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.inventory.retain(|i| i.id != id);
                s
            })
            .await
    }

    // -------------------------------------------------------------------------
    // World
    // -------------------------------------------------------------------------

    /// Install a freshly generated world map and run an immediate
    /// simulation tick over it.
    pub async fn update_world_map(&self, map: WorldMap) -> Snapshot {
        self.state
            .apply(move |mut s| {
                s.world_map = Some(map);
                s
            })
            .await;
        self.run_world_tick().await
    }

    /// Advance the world simulation to now. Writes the updated object
    /// set through the store and pins it for persistence only when the
    /// tick changed something.
    pub async fn run_world_tick(&self) -> Snapshot {
        let snap = self.state.current().await;
        let Some(map) = snap.world_map.clone() else {
            return snap;
        };
        let outcome = self
            .world_tick
            .tick(&map, snap.world_objects.clone(), self.clock.now());
        if !outcome.changed {
            return snap;
        }
        let objects = outcome.objects;
        let applied = self
            .state
            .apply(move |mut s| {
                s.world_objects = objects;
                s
            })
            .await;
        self.scheduler.notify(Some(applied.clone()));
        applied
    }

    pub async fn add_discovered_location(&self, code: impl Into<String>) -> Snapshot {
        let code = code.into();
        self.state
            .apply(move |mut s| {
                s.discovered_locations.insert(code);
                s
            })
            .await
    }

    // -------------------------------------------------------------------------
    // Persistence and lifecycle
    // -------------------------------------------------------------------------

    /// Cancel any pending debounce and flush immediately.
    pub async fn save(&self) {
        self.scheduler.save_now().await;
    }

    /// Run (or re-run) the initial load for this session's player.
    pub async fn load(&self) -> Snapshot {
        self.reconciler.load(self.player).await
    }

    /// Bump the snapshot revision without changing state, forcing
    /// comparison-based observers to refresh.
    pub async fn refresh(&self) -> Snapshot {
        self.state.apply(|s| s).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::{OverlapPolicy, WorldTickConfig};
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockHeroScorePort, MockPersistencePort, MockRandomPort, PersistencePort,
    };
    use emberfall_domain::{default_spawn_catalog, HeroClass};

    fn actions() -> GameActions {
        let mut scorer = MockHeroScorePort::new();
        scorer.expect_score().returning(|h| h.level as u64 * 10);
        let player = PlayerId::new();
        let state = Arc::new(StateStore::new(player, Arc::new(scorer)));

        let mut persistence = MockPersistencePort::new();
        persistence.expect_put_profile().returning(|_, _| Ok(()));
        persistence
            .expect_put_roster()
            .returning(|_, sent| Ok(sent.to_vec()));
        persistence.expect_put_inventory().returning(|_, _| Ok(()));
        let persistence: Arc<dyn PersistencePort> = Arc::new(persistence);

        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let scheduler = SaveScheduler::new(
            Arc::clone(&state),
            Arc::clone(&persistence),
            clock.clone(),
            Duration::from_millis(2_000),
            Duration::from_millis(1_000),
        );
        let reconciler = Arc::new(LoadReconciler::new(
            Arc::clone(&state),
            persistence,
            OverlapPolicy::default(),
        ));
        let mut random = MockRandomPort::new();
        random.expect_gen_range().returning(|min, _| min);
        let world_tick = Arc::new(WorldTickService::new(
            Arc::new(random),
            default_spawn_catalog(),
            WorldTickConfig::default(),
        ));
        GameActions::new(player, state, scheduler, reconciler, world_tick, clock)
    }

    #[tokio::test]
    async fn party_setter_dedups_and_caps() {
        let actions = actions();
        let mut ids = Vec::new();
        for i in 0..6 {
            let snap = actions
                .add_hero(Hero::new(format!("Hero {i}"), HeroClass::Warrior))
                .await
                .expect("add hero");
            ids = snap.heroes.iter().map(|h| h.id).collect();
        }

        let mut requested = ids.clone();
        requested.push(ids[0]); // duplicate
        let snap = actions.set_active_party(requested).await;
        assert_eq!(snap.party.len(), 4);
        assert_eq!(snap.party.ids(), &ids[..4]);
    }

    #[tokio::test]
    async fn duplicate_hero_is_rejected() {
        let actions = actions();
        actions
            .add_hero(Hero::new("Brandt", HeroClass::Warrior))
            .await
            .expect("first add");
        let err = actions
            .add_hero(Hero::new("Brandt", HeroClass::Warrior))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
        assert_eq!(actions.snapshot().await.heroes.len(), 1);
    }

    #[tokio::test]
    async fn removing_a_hero_also_leaves_the_party() {
        let actions = actions();
        let snap = actions
            .add_hero(Hero::new("Brandt", HeroClass::Warrior))
            .await
            .expect("add hero");
        let id = snap.heroes[0].id;
        actions.set_active_party(vec![id]).await;

        let snap = actions.remove_hero(id).await;
        assert!(snap.heroes.is_empty());
        assert!(snap.party.is_empty());
    }

    #[tokio::test]
    async fn failed_spend_leaves_state_unchanged() {
        let actions = actions();
        actions.add_gold(5).await;
        assert!(actions.spend_gold(10).await.is_err());
        assert_eq!(actions.snapshot().await.resources.gold, 5);
    }

    #[tokio::test]
    async fn combat_sync_updates_roster_in_bulk() {
        let actions = actions();
        let snap = actions
            .add_hero(Hero::new("Brandt", HeroClass::Warrior))
            .await
            .expect("add hero");
        let id = snap.heroes[0].id;

        let snap = actions
            .sync_combat_results(vec![HeroCombatUpdate {
                hero_id: id,
                level: 3,
                experience: 250,
                required_experience: 400,
                talent_points: 2,
                hit_points: 9_999, // clamped to max
            }])
            .await;
        let hero = snap.hero(id).expect("hero");
        assert_eq!(hero.level, 3);
        assert_eq!(hero.hit_points, hero.max_hit_points);
        // Derived combat power follows the new level once the hero is
        // in the party.
        let snap = actions.set_active_party(vec![id]).await;
        assert_eq!(snap.combat_power, 30);
    }

    #[tokio::test]
    async fn refresh_bumps_revision_without_state_change() {
        let actions = actions();
        let before = actions.snapshot().await;
        let after = actions.refresh().await;
        assert_eq!(after.revision, before.revision + 1);
        assert!(after.save_relevant_eq(&before));
    }

    #[tokio::test]
    async fn world_tick_without_a_map_is_a_no_op() {
        let actions = actions();
        let before = actions.snapshot().await;
        let after = actions.run_world_tick().await;
        assert_eq!(after.revision, before.revision);
    }
}
