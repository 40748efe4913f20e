//! Time-based world simulation: respawns, expiries, repopulation.
//!
//! The service owns no state; it maps a world-object set forward to a
//! given instant and reports whether anything changed so the caller can
//! skip a needless persistence trigger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use emberfall_domain::{
    ObjectClass, SpawnCatalog, TilePos, WorldMap, WorldObject, WorldObjectId, WorldObjectKind,
    WorldObjectSet,
};

use crate::config::WorldTickConfig;
use crate::infrastructure::ports::RandomPort;

pub struct TickOutcome {
    pub changed: bool,
    pub objects: WorldObjectSet,
}

pub struct WorldTickService {
    random: Arc<dyn RandomPort>,
    catalog: SpawnCatalog,
    config: WorldTickConfig,
}

impl WorldTickService {
    pub fn new(random: Arc<dyn RandomPort>, catalog: SpawnCatalog, config: WorldTickConfig) -> Self {
        Self {
            random,
            catalog,
            config,
        }
    }

    /// Advance the world-object set to `now`.
    pub fn tick(&self, map: &WorldMap, objects: WorldObjectSet, now: DateTime<Utc>) -> TickOutcome {
        let mut objects = objects;
        let mut changed = false;

        // Respawn pass: defeated respawnables whose delay has elapsed
        // come back, with their state clock reset to now.
        for object in objects.iter_mut() {
            if object.respawn_due(now) {
                object.active = true;
                object.state_since = now;
                changed = true;
            }
        }

        // Expiry pass: active expiring objects past their expiry wink out.
        for object in objects.iter_mut() {
            if object.expiry_due(now) {
                object.active = false;
                object.state_since = now;
                changed = true;
            }
        }

        // Repopulation: bring the active expiring population back toward
        // the target. A spawn that finds no valid tile within the
        // attempt budget is skipped; partial repopulation is acceptable.
        let deficit = self
            .config
            .target_population
            .saturating_sub(objects.active_count(ObjectClass::Expiring));
        for _ in 0..deficit {
            match self.spawn(map, &objects, now) {
                Some(object) => {
                    objects.push(object);
                    changed = true;
                }
                None => {
                    tracing::debug!("no valid spawn tile within attempt budget, skipping");
                }
            }
        }

        TickOutcome { changed, objects }
    }

    fn spawn(
        &self,
        map: &WorldMap,
        objects: &WorldObjectSet,
        now: DateTime<Utc>,
    ) -> Option<WorldObject> {
        if map.width == 0 || map.height == 0 || self.catalog.is_empty() {
            return None;
        }
        let position = self.sample_tile(map, objects)?;

        let roll = self.random.gen_range(0, self.catalog.total_weight().saturating_sub(1));
        let entry = self.catalog.pick(roll)?;
        let power = self.random.gen_range(entry.min_power, entry.max_power);

        Some(WorldObject {
            id: WorldObjectId::new(),
            kind: WorldObjectKind::Expiring {
                expires_at: now + Duration::seconds(self.config.lifetime_secs as i64),
            },
            archetype: entry.archetype.clone(),
            power,
            position,
            active: true,
            state_since: now,
        })
    }

    /// Uniform tile sampling, rejecting impassable tiles and tiles
    /// already holding an active expiring object, up to the attempt
    /// budget.
    fn sample_tile(&self, map: &WorldMap, objects: &WorldObjectSet) -> Option<TilePos> {
        for _ in 0..self.config.spawn_attempts {
            let pos = TilePos::new(
                self.random.gen_range(0, map.width - 1),
                self.random.gen_range(0, map.height - 1),
            );
            if map.is_passable(pos) && !objects.is_occupied(pos, ObjectClass::Expiring) {
                return Some(pos);
            }
        }
        None
    }
}
