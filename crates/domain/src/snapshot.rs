//! The session snapshot: one immutable-per-version value holding the
//! complete session state.
//!
//! Mutation happens exclusively through the client's state store, which
//! applies whole-snapshot transforms and recomputes the derived fields
//! afterwards. Every applied transform produces a new value with a bumped
//! revision so observers can detect change by comparison.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hero::Hero;
use crate::ids::{HeroId, PlayerId};
use crate::inventory::InventoryItem;
use crate::party::ActiveParty;
use crate::resources::{AccountTier, ResourceLedger};
use crate::world::{WorldMap, WorldObjectSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    // Remote-authoritative
    pub identity: PlayerId,
    pub display_name: String,
    pub tier: AccountTier,
    pub discovered_locations: BTreeSet<String>,
    pub cooldowns: BTreeMap<String, DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,

    // Mixed ownership: gold/gems remote-authoritative, energy local
    pub resources: ResourceLedger,

    // Local-authoritative
    pub heroes: Vec<Hero>,
    pub party: ActiveParty,
    pub inventory: Vec<InventoryItem>,
    pub world_map: Option<WorldMap>,
    pub world_objects: WorldObjectSet,

    // Derived, recomputed after every transform
    pub combat_power: u64,

    // Session-local bookkeeping, never persisted
    pub loading: bool,
    pub load_error: Option<String>,
    pub revision: u64,
}

impl Snapshot {
    /// Empty snapshot created at session start, before the initial load.
    pub fn empty(identity: PlayerId) -> Self {
        Self {
            identity,
            display_name: String::new(),
            tier: AccountTier::default(),
            discovered_locations: BTreeSet::new(),
            cooldowns: BTreeMap::new(),
            created_at: None,
            resources: ResourceLedger::default(),
            heroes: Vec::new(),
            party: ActiveParty::default(),
            inventory: Vec::new(),
            world_map: None,
            world_objects: WorldObjectSet::default(),
            combat_power: 0,
            loading: false,
            load_error: None,
            revision: 0,
        }
    }

    pub fn hero(&self, id: HeroId) -> Option<&Hero> {
        self.heroes.iter().find(|h| h.id == id)
    }

    pub fn hero_mut(&mut self, id: HeroId) -> Option<&mut Hero> {
        self.heroes.iter_mut().find(|h| h.id == id)
    }

    pub fn hero_ids(&self) -> BTreeSet<HeroId> {
        self.heroes.iter().map(|h| h.id).collect()
    }

    /// Recompute the derived fields: max energy from tier (with energy
    /// clamped into range) and aggregate combat power over the alive
    /// members of the active party, using the supplied scoring function.
    pub fn recompute_derived(&mut self, score: &dyn Fn(&Hero) -> u64) {
        self.resources.recompute_max_energy(self.tier);
        self.combat_power = self
            .party
            .ids()
            .iter()
            .filter_map(|id| self.hero(*id))
            .filter(|h| h.is_alive())
            .map(|h| score(h))
            .sum();
    }

    /// True when every persisted field group matches. Used to decide
    /// whether an applied transform should trigger a save; session-local
    /// bookkeeping and the revision counter do not count.
    pub fn save_relevant_eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name
            && self.tier == other.tier
            && self.discovered_locations == other.discovered_locations
            && self.cooldowns == other.cooldowns
            && self.resources == other.resources
            && self.heroes == other.heroes
            && self.party == other.party
            && self.inventory == other.inventory
            && self.world_map == other.world_map
            && self.world_objects == other.world_objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hero::HeroClass;
    use crate::resources::max_energy_for;

    fn snapshot_with_party() -> Snapshot {
        let mut snap = Snapshot::empty(PlayerId::new());
        snap.heroes = vec![
            Hero::new("Brandt", HeroClass::Warrior),
            Hero::new("Sylva", HeroClass::Ranger),
        ];
        snap.party = ActiveParty::sanitized(snap.heroes.iter().map(|h| h.id), &snap.heroes);
        snap
    }

    #[test]
    fn combat_power_sums_alive_party_members_only() {
        let mut snap = snapshot_with_party();
        snap.heroes[1].hit_points = 0;
        snap.recompute_derived(&|_| 10);
        assert_eq!(snap.combat_power, 10);
    }

    #[test]
    fn combat_power_ignores_heroes_outside_party() {
        let mut snap = snapshot_with_party();
        snap.heroes.push(Hero::new("Maelis", HeroClass::Mage));
        snap.recompute_derived(&|_| 7);
        assert_eq!(snap.combat_power, 14);
    }

    #[test]
    fn derived_recompute_follows_tier() {
        let mut snap = snapshot_with_party();
        snap.tier = AccountTier::Gold;
        snap.recompute_derived(&|_| 0);
        assert_eq!(snap.resources.max_energy, max_energy_for(AccountTier::Gold));
    }

    #[test]
    fn revision_and_loading_are_not_save_relevant() {
        let a = snapshot_with_party();
        let mut b = a.clone();
        b.revision += 1;
        b.loading = true;
        b.load_error = Some("boom".into());
        assert!(a.save_relevant_eq(&b));

        b.resources.gold += 1;
        assert!(!a.save_relevant_eq(&b));
    }
}
