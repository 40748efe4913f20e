//! Wire-format records for the persistence service and push channel.
//!
//! Records use raw UUIDs plus the domain's pure vocabulary enums, with
//! camelCase field names on the wire. Push payloads are full
//! [`ProfileRecord`]s: the channel delivers the complete record on any
//! write to it, including this client's own saves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use emberfall_domain::{
    AccountTier, Hero, HeroClass, HeroId, InventoryItem, ItemId, Snapshot, TilePos, WorldMap,
    WorldObject, WorldObjectId, WorldObjectKind, WorldObjectSet,
};

// =============================================================================
// Hero and item records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroRecord {
    pub id: Uuid,
    pub name: String,
    pub class: HeroClass,
    pub level: u32,
    pub experience: u64,
    pub required_experience: u64,
    pub talent_points: u32,
    pub hit_points: u32,
    pub max_hit_points: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    /// Active-party position, upserted with the hero and consulted only
    /// while reconstructing the party during load.
    pub party_ordinal: Option<u32>,
    pub equipment: Vec<Uuid>,
}

impl From<&Hero> for HeroRecord {
    fn from(hero: &Hero) -> Self {
        Self {
            id: hero.id.to_uuid(),
            name: hero.name.clone(),
            class: hero.class,
            level: hero.level,
            experience: hero.experience,
            required_experience: hero.required_experience,
            talent_points: hero.talent_points,
            hit_points: hero.hit_points,
            max_hit_points: hero.max_hit_points,
            attack: hero.stats.attack,
            defense: hero.stats.defense,
            speed: hero.stats.speed,
            party_ordinal: hero.party_ordinal,
            equipment: hero.equipment.iter().map(|i| i.to_uuid()).collect(),
        }
    }
}

impl HeroRecord {
    pub fn with_ordinal(mut self, ordinal: Option<u32>) -> Self {
        self.party_ordinal = ordinal;
        self
    }

    pub fn to_domain(&self) -> Hero {
        Hero {
            id: HeroId::from_uuid(self.id),
            name: self.name.clone(),
            class: self.class,
            level: self.level,
            experience: self.experience,
            required_experience: self.required_experience,
            talent_points: self.talent_points,
            hit_points: self.hit_points,
            max_hit_points: self.max_hit_points,
            stats: emberfall_domain::CombatStats {
                attack: self.attack,
                defense: self.defense,
                speed: self.speed,
            },
            party_ordinal: self.party_ordinal,
            equipment: self.equipment.iter().map(|i| ItemId::from_uuid(*i)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub quantity: u32,
}

impl From<&InventoryItem> for ItemRecord {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id.to_uuid(),
            name: item.name.clone(),
            kind: item.kind.clone(),
            quantity: item.quantity,
        }
    }
}

impl ItemRecord {
    pub fn to_domain(&self) -> InventoryItem {
        InventoryItem {
            id: ItemId::from_uuid(self.id),
            name: self.name.clone(),
            kind: self.kind.clone(),
            quantity: self.quantity,
        }
    }
}

// =============================================================================
// World records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldObjectRecord {
    pub id: Uuid,
    pub kind: WorldObjectKind,
    pub archetype: String,
    pub power: u32,
    pub x: u32,
    pub y: u32,
    pub active: bool,
    pub state_since: DateTime<Utc>,
}

impl From<&WorldObject> for WorldObjectRecord {
    fn from(object: &WorldObject) -> Self {
        Self {
            id: object.id.to_uuid(),
            kind: object.kind.clone(),
            archetype: object.archetype.clone(),
            power: object.power,
            x: object.position.x,
            y: object.position.y,
            active: object.active,
            state_since: object.state_since,
        }
    }
}

impl WorldObjectRecord {
    pub fn to_domain(&self) -> WorldObject {
        WorldObject {
            id: WorldObjectId::from_uuid(self.id),
            kind: self.kind.clone(),
            archetype: self.archetype.clone(),
            power: self.power,
            position: TilePos::new(self.x, self.y),
            active: self.active,
            state_since: self.state_since,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMapRecord {
    pub width: u32,
    pub height: u32,
    pub blocked: Vec<TilePos>,
}

impl From<&WorldMap> for WorldMapRecord {
    fn from(map: &WorldMap) -> Self {
        let mut blocked: Vec<TilePos> = map.blocked.iter().copied().collect();
        blocked.sort_by_key(|p| (p.y, p.x));
        Self {
            width: map.width,
            height: map.height,
            blocked,
        }
    }
}

impl WorldMapRecord {
    pub fn to_domain(&self) -> WorldMap {
        WorldMap {
            width: self.width,
            height: self.height,
            blocked: self.blocked.iter().copied().collect(),
        }
    }
}

// =============================================================================
// Profile record
// =============================================================================

/// The full per-player record held by the persistence service. Also the
/// push-channel payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub player_id: Uuid,
    pub display_name: String,
    pub tier: AccountTier,
    pub gold: u64,
    pub gems: u64,
    pub energy: u32,
    /// Cached copy of the derived maximum; clients recompute it from
    /// tier and never trust this field.
    pub max_energy: u32,
    pub discovered_locations: Vec<String>,
    pub cooldowns: BTreeMap<String, DateTime<Utc>>,
    pub world_map: Option<WorldMapRecord>,
    pub world_objects: Vec<WorldObjectRecord>,
    pub inventory: Vec<ItemRecord>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Fresh record for a player with no remote state yet.
    pub fn new(player_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            player_id,
            display_name: String::new(),
            tier: AccountTier::default(),
            gold: 0,
            gems: 0,
            energy: emberfall_domain::BASE_MAX_ENERGY,
            max_energy: emberfall_domain::BASE_MAX_ENERGY,
            discovered_locations: Vec::new(),
            cooldowns: BTreeMap::new(),
            world_map: None,
            world_objects: Vec::new(),
            inventory: Vec::new(),
            created_at,
        }
    }

    /// Wire form of a snapshot, as written by the debounced save.
    pub fn from_snapshot(snapshot: &Snapshot, created_at: DateTime<Utc>) -> Self {
        Self {
            player_id: snapshot.identity.to_uuid(),
            display_name: snapshot.display_name.clone(),
            tier: snapshot.tier,
            gold: snapshot.resources.gold,
            gems: snapshot.resources.gems,
            energy: snapshot.resources.energy,
            max_energy: snapshot.resources.max_energy,
            discovered_locations: snapshot.discovered_locations.iter().cloned().collect(),
            cooldowns: snapshot.cooldowns.clone(),
            world_map: snapshot.world_map.as_ref().map(WorldMapRecord::from),
            world_objects: snapshot.world_objects.iter().map(WorldObjectRecord::from).collect(),
            inventory: snapshot.inventory.iter().map(ItemRecord::from).collect(),
            created_at: snapshot.created_at.unwrap_or(created_at),
        }
    }

    pub fn world_objects_to_domain(&self) -> WorldObjectSet {
        WorldObjectSet::new(self.world_objects.iter().map(|o| o.to_domain()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use emberfall_domain::PlayerId;

    #[test]
    fn hero_record_wire_format_is_camel_case() {
        let hero = Hero::new("Brandt", HeroClass::Warrior);
        let record = HeroRecord::from(&hero).with_ordinal(Some(2));
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["partyOrdinal"], 2);
        assert!(json.get("requiredExperience").is_some());
    }

    #[test]
    fn snapshot_round_trips_through_profile_record() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut snap = Snapshot::empty(PlayerId::new());
        snap.display_name = "Karst".into();
        snap.resources.gold = 42;
        snap.discovered_locations.insert("emberhold".into());

        let record = ProfileRecord::from_snapshot(&snap, now);
        assert_eq!(record.player_id, snap.identity.to_uuid());
        assert_eq!(record.gold, 42);
        assert_eq!(record.discovered_locations, vec!["emberhold".to_string()]);
        assert_eq!(record.created_at, now);
    }
}
