//! Emberfall Protocol - wire records shared between the client sync core
//! and the persistence/push services.

pub mod records;

pub use records::{HeroRecord, ItemRecord, ProfileRecord, WorldMapRecord, WorldObjectRecord};
