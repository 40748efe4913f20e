//! Hero roster entities.
//!
//! A hero's stats are computed by an external combat system; this crate
//! stores them, enforces roster invariants, and carries the party ordinal
//! used to rebuild the active party after a reload.

use serde::{Deserialize, Serialize};

use crate::ids::{HeroId, ItemId};

/// Hero archetype. Two heroes with the same (name, class) pair are
/// considered duplicates and only one may exist in a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeroClass {
    Warrior,
    Ranger,
    Mage,
    Cleric,
    Rogue,
}

impl HeroClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeroClass::Warrior => "warrior",
            HeroClass::Ranger => "ranger",
            HeroClass::Mage => "mage",
            HeroClass::Cleric => "cleric",
            HeroClass::Rogue => "rogue",
        }
    }
}

/// Externally computed combat attributes, stored verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub class: HeroClass,
    pub level: u32,
    pub experience: u64,
    pub required_experience: u64,
    pub talent_points: u32,
    pub hit_points: u32,
    pub max_hit_points: u32,
    pub stats: CombatStats,
    /// Position within the active party as persisted remotely.
    /// Only consulted while reconstructing the party during load.
    pub party_ordinal: Option<u32>,
    /// Equipment association; item modeling is external.
    pub equipment: Vec<ItemId>,
}

impl Hero {
    pub fn new(name: impl Into<String>, class: HeroClass) -> Self {
        Self {
            id: HeroId::new(),
            name: name.into(),
            class,
            level: 1,
            experience: 0,
            required_experience: 100,
            talent_points: 0,
            hit_points: 50,
            max_hit_points: 50,
            stats: CombatStats::default(),
            party_ordinal: None,
            equipment: Vec::new(),
        }
    }

    /// Duplicate-detection key: two heroes sharing (name, class) are
    /// the same hero as far as the roster is concerned.
    pub fn dedup_key(&self) -> (&str, HeroClass) {
        (self.name.as_str(), self.class)
    }

    /// Defeated heroes contribute nothing to aggregate combat power.
    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }
}

/// Roster synthesized for a brand-new player whose remote roster is empty:
/// four heroes of distinct predefined classes.
pub fn default_starter_roster() -> Vec<Hero> {
    vec![
        Hero::new("Brandt", HeroClass::Warrior),
        Hero::new("Sylva", HeroClass::Ranger),
        Hero::new("Maelis", HeroClass::Mage),
        Hero::new("Odran", HeroClass::Cleric),
    ]
}
