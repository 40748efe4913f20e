//! Shared (non-equipped) inventory items.
//!
//! Item and equipment modeling is external; this core relocates items
//! between the snapshot and the persistent store.

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    /// Opaque item kind tag understood by the item system.
    pub kind: String,
    pub quantity: u32,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            kind: kind.into(),
            quantity,
        }
    }
}
