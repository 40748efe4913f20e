//! World map and time-governed world objects.
//!
//! Map generation is external; this core treats the map as opaque
//! passability data it samples spawn tiles from, and world objects as
//! entities it relocates and time-stamps.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::WorldObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Passability view of an externally generated map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMap {
    pub width: u32,
    pub height: u32,
    /// Tiles the spawner must reject (water, cliffs, structures).
    pub blocked: HashSet<TilePos>,
}

impl WorldMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            blocked: HashSet::new(),
        }
    }

    pub fn is_passable(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height && !self.blocked.contains(&pos)
    }
}

/// Lifecycle class of a world object, used when checking tile occupancy:
/// two active objects of the same class never share a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectClass {
    Respawnable,
    Expiring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldObjectKind {
    /// Defeated objects return to active after the respawn delay.
    Respawnable { respawn_secs: u32 },
    /// Active objects vanish once their expiry passes.
    Expiring { expires_at: DateTime<Utc> },
}

impl WorldObjectKind {
    pub fn class(&self) -> ObjectClass {
        match self {
            WorldObjectKind::Respawnable { .. } => ObjectClass::Respawnable,
            WorldObjectKind::Expiring { .. } => ObjectClass::Expiring,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: WorldObjectId,
    pub kind: WorldObjectKind,
    /// Archetype name drawn from the spawn catalog.
    pub archetype: String,
    /// Randomized attribute rolled at spawn time.
    pub power: u32,
    pub position: TilePos,
    /// false = defeated (respawnable) or expired (expiring).
    pub active: bool,
    /// When the current active/inactive state began.
    pub state_since: DateTime<Utc>,
}

impl WorldObject {
    pub fn class(&self) -> ObjectClass {
        self.kind.class()
    }

    /// A defeated respawnable object becomes due once its delay elapses.
    pub fn respawn_due(&self, now: DateTime<Utc>) -> bool {
        match &self.kind {
            WorldObjectKind::Respawnable { respawn_secs } if !self.active => {
                now >= self.state_since + Duration::seconds(*respawn_secs as i64)
            }
            _ => false,
        }
    }

    /// An active expiring object is overdue once its expiry passes.
    pub fn expiry_due(&self, now: DateTime<Utc>) -> bool {
        match &self.kind {
            WorldObjectKind::Expiring { expires_at } if self.active => now >= *expires_at,
            _ => false,
        }
    }
}

/// The snapshot's collection of time-governed entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldObjectSet(Vec<WorldObject>);

impl WorldObjectSet {
    pub fn new(objects: Vec<WorldObject>) -> Self {
        Self(objects)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldObject> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WorldObject> {
        self.0.iter_mut()
    }

    pub fn push(&mut self, object: WorldObject) {
        self.0.push(object);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn active_count(&self, class: ObjectClass) -> usize {
        self.0
            .iter()
            .filter(|o| o.active && o.class() == class)
            .count()
    }

    /// A tile is occupied for a class when an active object of that
    /// class already stands on it.
    pub fn is_occupied(&self, pos: TilePos, class: ObjectClass) -> bool {
        self.0
            .iter()
            .any(|o| o.active && o.class() == class && o.position == pos)
    }

    pub fn into_inner(self) -> Vec<WorldObject> {
        self.0
    }
}

/// One archetype the spawner can roll, with a selection weight and a
/// power range for the randomized attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub archetype: String,
    pub weight: u32,
    pub min_power: u32,
    pub max_power: u32,
}

/// Weighted archetype catalog used to repopulate expiring objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnCatalog {
    entries: Vec<SpawnEntry>,
}

impl SpawnCatalog {
    pub fn new(entries: Vec<SpawnEntry>) -> Self {
        Self { entries }
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Select an entry for a roll in `0..total_weight()`.
    pub fn pick(&self, roll: u32) -> Option<&SpawnEntry> {
        let mut remaining = roll;
        for entry in &self.entries {
            if remaining < entry.weight {
                return Some(entry);
            }
            remaining -= entry.weight;
        }
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reference catalog for wandering encounters.
pub fn default_spawn_catalog() -> SpawnCatalog {
    SpawnCatalog::new(vec![
        SpawnEntry {
            archetype: "ember_wisp".into(),
            weight: 50,
            min_power: 5,
            max_power: 15,
        },
        SpawnEntry {
            archetype: "ash_prowler".into(),
            weight: 30,
            min_power: 15,
            max_power: 35,
        },
        SpawnEntry {
            archetype: "cinder_golem".into(),
            weight: 15,
            min_power: 35,
            max_power: 60,
        },
        SpawnEntry {
            archetype: "flame_revenant".into(),
            weight: 5,
            min_power: 60,
            max_power: 100,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn respawn_due_only_after_delay() {
        let obj = WorldObject {
            id: WorldObjectId::new(),
            kind: WorldObjectKind::Respawnable { respawn_secs: 1800 },
            archetype: "den".into(),
            power: 10,
            position: TilePos::new(1, 1),
            active: false,
            state_since: at(10, 0),
        };
        assert!(!obj.respawn_due(at(10, 29)));
        assert!(obj.respawn_due(at(10, 31)));
    }

    #[test]
    fn active_respawnable_is_never_due() {
        let obj = WorldObject {
            id: WorldObjectId::new(),
            kind: WorldObjectKind::Respawnable { respawn_secs: 60 },
            archetype: "den".into(),
            power: 10,
            position: TilePos::new(1, 1),
            active: true,
            state_since: at(10, 0),
        };
        assert!(!obj.respawn_due(at(12, 0)));
    }

    #[test]
    fn occupancy_is_per_class_and_active_only() {
        let pos = TilePos::new(2, 2);
        let mut set = WorldObjectSet::default();
        set.push(WorldObject {
            id: WorldObjectId::new(),
            kind: WorldObjectKind::Expiring { expires_at: at(23, 0) },
            archetype: "ember_wisp".into(),
            power: 5,
            position: pos,
            active: true,
            state_since: at(10, 0),
        });
        assert!(set.is_occupied(pos, ObjectClass::Expiring));
        assert!(!set.is_occupied(pos, ObjectClass::Respawnable));
        assert!(!set.is_occupied(TilePos::new(3, 3), ObjectClass::Expiring));
    }

    #[test]
    fn catalog_pick_walks_weights_in_order() {
        let catalog = default_spawn_catalog();
        assert_eq!(catalog.total_weight(), 100);
        assert_eq!(catalog.pick(0).map(|e| e.archetype.as_str()), Some("ember_wisp"));
        assert_eq!(catalog.pick(49).map(|e| e.archetype.as_str()), Some("ember_wisp"));
        assert_eq!(catalog.pick(50).map(|e| e.archetype.as_str()), Some("ash_prowler"));
        assert_eq!(catalog.pick(99).map(|e| e.archetype.as_str()), Some("flame_revenant"));
    }

    #[test]
    fn blocked_and_out_of_bounds_tiles_are_impassable() {
        let mut map = WorldMap::new(4, 4);
        map.blocked.insert(TilePos::new(1, 1));
        assert!(map.is_passable(TilePos::new(0, 0)));
        assert!(!map.is_passable(TilePos::new(1, 1)));
        assert!(!map.is_passable(TilePos::new(4, 0)));
    }
}
