//! Initial snapshot construction and duplicate-load suppression.
//!
//! `load` builds the session snapshot from remote data: fetch-or-create
//! the profile, fetch the roster (synthesizing a starter roster for new
//! players), deduplicate by (name, class), rebuild the active party from
//! persisted ordinals, and reconcile against any roster already resident
//! using an overlap heuristic that distinguishes a repeated invocation
//! from a genuine mid-session addition or a full reload.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use emberfall_domain::{
    default_starter_roster, ActiveParty, Hero, HeroClass, HeroId, PlayerId, Snapshot,
    MAX_PARTY_SIZE,
};
use emberfall_protocol::ProfileRecord;

use crate::config::OverlapPolicy;
use crate::infrastructure::ports::{PersistError, PersistencePort};
use crate::stores::StateStore;

/// Per-identity startup state machine. `Loading` makes reentrant calls
/// no-ops; a failed load drops back to `Unstarted` so a retry is
/// possible; a repeated call after `Loaded` is resolved by the overlap
/// heuristic instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Unstarted,
    Loading,
    Loaded,
}

pub struct LoadReconciler {
    state: Arc<StateStore>,
    persistence: Arc<dyn PersistencePort>,
    policy: OverlapPolicy,
    phases: std::sync::Mutex<HashMap<PlayerId, LoadPhase>>,
}

impl LoadReconciler {
    pub fn new(
        state: Arc<StateStore>,
        persistence: Arc<dyn PersistencePort>,
        policy: OverlapPolicy,
    ) -> Self {
        Self {
            state,
            persistence,
            policy,
            phases: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Build (or rebuild) the snapshot for `player`. Always clears the
    /// loading flag before returning, success or failure.
    pub async fn load(&self, player: PlayerId) -> Snapshot {
        if !self.try_begin(player) {
            tracing::debug!(%player, "load already in progress, ignoring reentrant call");
            return self.state.current().await;
        }

        self.state.set_loading(true).await;
        match self.run_load(player).await {
            Ok(()) => {
                self.set_phase(player, LoadPhase::Loaded);
                self.state.set_loading(false).await
            }
            Err(e) => {
                tracing::warn!(%player, error = %e, "load failed");
                self.set_phase(player, LoadPhase::Unstarted);
                let message = e.to_string();
                self.state
                    .apply(move |mut snap| {
                        snap.load_error = Some(message);
                        snap
                    })
                    .await;
                self.state.set_loading(false).await
            }
        }
    }

    /// Atomic check-and-set into `Loading`; false when already loading.
    fn try_begin(&self, player: PlayerId) -> bool {
        let mut phases = self.phases.lock().expect("load phase lock poisoned");
        let phase = phases.entry(player).or_insert(LoadPhase::Unstarted);
        if *phase == LoadPhase::Loading {
            return false;
        }
        *phase = LoadPhase::Loading;
        true
    }

    fn set_phase(&self, player: PlayerId, phase: LoadPhase) {
        self.phases
            .lock()
            .expect("load phase lock poisoned")
            .insert(player, phase);
    }

    async fn run_load(&self, player: PlayerId) -> Result<(), PersistError> {
        let profile = self.persistence.get_or_create_profile(player).await?;
        let records = self.persistence.get_roster(player).await?;

        let fetched: Vec<Hero> = if records.is_empty() {
            tracing::info!(%player, "remote roster empty, synthesizing starter roster");
            default_starter_roster()
        } else {
            records.iter().map(|r| r.to_domain()).collect()
        };
        let fetched = dedup_roster(fetched);
        let party_order = reconstruct_party_order(&fetched);

        let policy = self.policy;
        self.state
            .apply(move |resident| reconcile(resident, profile, fetched, party_order, policy))
            .await;
        Ok(())
    }
}

/// Keep the first occurrence of each (name, class) pair in fetch order;
/// log and drop the rest.
fn dedup_roster(heroes: Vec<Hero>) -> Vec<Hero> {
    let mut seen: HashSet<(String, HeroClass)> = HashSet::new();
    let mut kept = Vec::with_capacity(heroes.len());
    for hero in heroes {
        let key = (hero.name.clone(), hero.class);
        if seen.insert(key) {
            kept.push(hero);
        } else {
            tracing::warn!(
                hero = %hero.id,
                name = %hero.name,
                class = hero.class.as_str(),
                "dropping duplicate roster entry"
            );
        }
    }
    kept
}

/// Rebuild the active party from per-hero ordinals. Heroes carrying an
/// ordinal are sorted by it; heroes without one are excluded. A roster
/// with no ordinals at all (new player) defaults to the first entries in
/// fetch order.
fn reconstruct_party_order(roster: &[Hero]) -> Vec<HeroId> {
    let mut ordered: Vec<(u32, HeroId)> = roster
        .iter()
        .filter_map(|h| h.party_ordinal.map(|o| (o, h.id)))
        .collect();
    if ordered.is_empty() {
        return roster.iter().take(MAX_PARTY_SIZE).map(|h| h.id).collect();
    }
    ordered.sort_by_key(|(ordinal, _)| *ordinal);
    ordered.into_iter().map(|(_, id)| id).collect()
}

#[derive(Debug, PartialEq, Eq)]
enum RosterDecision {
    /// Repeated invocation: keep the resident snapshot untouched.
    Duplicate,
    /// Genuine partial addition: append these fetched ids.
    Merge(Vec<HeroId>),
    /// Full legitimate (re)load: replace roster and party outright.
    Replace,
}

/// Overlap heuristic distinguishing a duplicate load from a legitimate
/// update. Only applies once a meaningful roster (>= party size) is
/// resident; anything else is a plain replace.
fn classify_roster(
    resident: &BTreeSet<HeroId>,
    fetched: &[HeroId],
    policy: &OverlapPolicy,
) -> RosterDecision {
    if resident.len() < MAX_PARTY_SIZE || fetched.is_empty() {
        return RosterDecision::Replace;
    }

    let fetched_set: BTreeSet<HeroId> = fetched.iter().copied().collect();
    let shared = fetched_set.intersection(resident).count();
    let overlap = shared as f64 / fetched_set.len() as f64;
    let size_delta = resident.len().abs_diff(fetched_set.len());
    let max_delta = policy.max_size_delta(fetched_set.len());

    if size_delta <= max_delta && overlap > policy.duplicate_threshold {
        RosterDecision::Duplicate
    } else if size_delta <= max_delta && overlap > policy.partial_threshold {
        let new_ids = fetched
            .iter()
            .copied()
            .filter(|id| !resident.contains(id))
            .collect();
        RosterDecision::Merge(new_ids)
    } else {
        RosterDecision::Replace
    }
}

/// Copy the remote-authoritative profile fields into the snapshot and
/// recompute the energy bound from tier. `full` additionally takes the
/// remote energy, world data, and inventory, which only a full (re)load
/// may overwrite.
fn apply_profile_fields(snap: &mut Snapshot, profile: &ProfileRecord, full: bool) {
    snap.display_name = profile.display_name.clone();
    snap.tier = profile.tier;
    snap.resources.gold = profile.gold;
    snap.resources.gems = profile.gems;
    snap.discovered_locations = profile.discovered_locations.iter().cloned().collect();
    snap.cooldowns = profile.cooldowns.clone();
    snap.created_at = Some(profile.created_at);
    if full {
        snap.resources.energy = profile.energy;
        snap.world_map = profile.world_map.as_ref().map(|m| m.to_domain());
        snap.world_objects = profile.world_objects_to_domain();
        snap.inventory = profile.inventory.iter().map(|i| i.to_domain()).collect();
    }
    // The persisted max is a cache; the tier is the ground truth.
    snap.resources.recompute_max_energy(snap.tier);
}

fn reconcile(
    resident: Snapshot,
    profile: ProfileRecord,
    fetched: Vec<Hero>,
    party_order: Vec<HeroId>,
    policy: OverlapPolicy,
) -> Snapshot {
    let resident_ids = resident.hero_ids();
    let fetched_ids: Vec<HeroId> = fetched.iter().map(|h| h.id).collect();

    match classify_roster(&resident_ids, &fetched_ids, &policy) {
        RosterDecision::Duplicate => {
            tracing::warn!(
                resident = resident_ids.len(),
                fetched = fetched_ids.len(),
                "duplicate load suppressed, keeping resident snapshot"
            );
            resident
        }
        RosterDecision::Merge(new_ids) => {
            tracing::warn!(
                resident = resident_ids.len(),
                appended = new_ids.len(),
                "partial roster addition, merging fetched heroes"
            );
            let mut snap = resident;
            for hero in fetched {
                if !new_ids.contains(&hero.id) {
                    continue;
                }
                if snap.heroes.iter().any(|h| h.dedup_key() == hero.dedup_key()) {
                    tracing::warn!(
                        hero = %hero.id,
                        name = %hero.name,
                        "merge skipped hero duplicating a resident (name, class)"
                    );
                    continue;
                }
                snap.heroes.push(hero);
            }
            apply_profile_fields(&mut snap, &profile, false);
            snap
        }
        RosterDecision::Replace => {
            let mut snap = resident;
            snap.heroes = fetched;
            snap.party = ActiveParty::sanitized(party_order, &snap.heroes);
            apply_profile_fields(&mut snap, &profile, true);
            snap
        }
    }
}
