//! Resource ledger: gold, gems, energy.
//!
//! Energy is bounded by a maximum derived from the account tier; the
//! derived value is recomputed on every tier change and the persisted
//! copy is only a cache for systems outside this core.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Base maximum energy before any tier bonus.
pub const BASE_MAX_ENERGY: u32 = 100;

/// Account tier as granted by the remote service. Remote-authoritative:
/// a push payload's tier always wins over the local value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountTier {
    #[default]
    Standard,
    Silver,
    Gold,
    Platinum,
}

impl AccountTier {
    pub fn energy_bonus(&self) -> u32 {
        match self {
            AccountTier::Standard => 0,
            AccountTier::Silver => 20,
            AccountTier::Gold => 50,
            AccountTier::Platinum => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTier::Standard => "standard",
            AccountTier::Silver => "silver",
            AccountTier::Gold => "gold",
            AccountTier::Platinum => "platinum",
        }
    }
}

/// Maximum energy is a pure function of tier; never trusted from a
/// persisted or pushed record.
pub fn max_energy_for(tier: AccountTier) -> u32 {
    BASE_MAX_ENERGY + tier.energy_bonus()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    pub gold: u64,
    pub gems: u64,
    pub energy: u32,
    /// Derived from tier; see [`max_energy_for`].
    pub max_energy: u32,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self {
            gold: 0,
            gems: 0,
            energy: BASE_MAX_ENERGY,
            max_energy: BASE_MAX_ENERGY,
        }
    }
}

impl ResourceLedger {
    /// Recompute the derived maximum from tier and clamp energy into
    /// `0..=max_energy`. Invariant: holds after every mutation, including
    /// a tier change that lowers the maximum below current energy.
    pub fn recompute_max_energy(&mut self, tier: AccountTier) {
        self.max_energy = max_energy_for(tier);
        self.energy = self.energy.min(self.max_energy);
    }

    pub fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    pub fn spend_gold(&mut self, amount: u64) -> Result<(), DomainError> {
        if self.gold < amount {
            return Err(DomainError::InsufficientResource {
                resource: "gold",
                have: self.gold,
                need: amount,
            });
        }
        self.gold -= amount;
        Ok(())
    }

    pub fn add_gems(&mut self, amount: u64) {
        self.gems = self.gems.saturating_add(amount);
    }

    pub fn spend_gems(&mut self, amount: u64) -> Result<(), DomainError> {
        if self.gems < amount {
            return Err(DomainError::InsufficientResource {
                resource: "gems",
                have: self.gems,
                need: amount,
            });
        }
        self.gems -= amount;
        Ok(())
    }

    /// Add energy, clamped to the derived maximum.
    pub fn add_energy(&mut self, amount: u32) {
        self.energy = self.energy.saturating_add(amount).min(self.max_energy);
    }

    pub fn spend_energy(&mut self, amount: u32) -> Result<(), DomainError> {
        if self.energy < amount {
            return Err(DomainError::InsufficientResource {
                resource: "energy",
                have: self.energy as u64,
                need: amount as u64,
            });
        }
        self.energy -= amount;
        Ok(())
    }
}
