//! Emberfall domain layer.
//!
//! Pure session-state types and invariants: no async, no I/O, no RNG.
//! The synchronization core in `emberfall-client` owns all mutation.

pub mod error;
pub mod hero;
pub mod ids;
pub mod inventory;
pub mod party;
pub mod resources;
pub mod snapshot;
pub mod world;

pub use error::DomainError;
pub use hero::{default_starter_roster, CombatStats, Hero, HeroClass};
pub use ids::{HeroId, ItemId, PlayerId, WorldObjectId};
pub use inventory::InventoryItem;
pub use party::{ActiveParty, MAX_PARTY_SIZE};
pub use resources::{max_energy_for, AccountTier, ResourceLedger, BASE_MAX_ENERGY};
pub use snapshot::Snapshot;
pub use world::{
    default_spawn_catalog, ObjectClass, SpawnCatalog, SpawnEntry, TilePos, WorldMap, WorldObject,
    WorldObjectKind, WorldObjectSet,
};
