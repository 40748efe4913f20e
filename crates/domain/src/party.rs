//! Active party value object.

use serde::{Deserialize, Serialize};

use crate::hero::Hero;
use crate::ids::HeroId;

/// Maximum number of heroes in the active party.
pub const MAX_PARTY_SIZE: usize = 4;

/// Ordered subset of the roster that fights. Always deduplicated,
/// validated against the roster, and capped at [`MAX_PARTY_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveParty(Vec<HeroId>);

impl ActiveParty {
    /// Build a party from caller-supplied ids, applying the invariants:
    /// ids not present in the roster are dropped silently, duplicates
    /// keep their first occurrence, and the result is capped at 4.
    pub fn sanitized(ids: impl IntoIterator<Item = HeroId>, roster: &[Hero]) -> Self {
        let mut members = Vec::new();
        for id in ids {
            if members.len() == MAX_PARTY_SIZE {
                break;
            }
            if members.contains(&id) {
                continue;
            }
            if roster.iter().any(|h| h.id == id) {
                members.push(id);
            }
        }
        Self(members)
    }

    pub fn ids(&self) -> &[HeroId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: HeroId) -> bool {
        self.0.contains(&id)
    }

    /// Remove a hero (e.g. after roster removal), preserving order.
    pub fn without(&self, id: HeroId) -> Self {
        Self(self.0.iter().copied().filter(|m| *m != id).collect())
    }

    /// Ordinal (0-based party position) for a member, if present.
    pub fn ordinal_of(&self, id: HeroId) -> Option<u32> {
        self.0.iter().position(|m| *m == id).map(|p| p as u32)
    }
}
