//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the client. Everything else is
//! concrete types. Ports exist for:
//! - The persistence service (could swap transports)
//! - The push channel (full-record change notifications)
//! - Hero scoring (combat math is an external system)
//! - Clock/Random (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use emberfall_domain::{Hero, PlayerId};
use emberfall_protocol::{HeroRecord, ItemRecord, ProfileRecord};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Already subscribed for this player")]
    AlreadySubscribed,
}

// =============================================================================
// Persistence Port
// =============================================================================

/// Remote persistent store. Last-write-wins per record; no internal
/// retries; any call may fail with a transport error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Fetch the player's profile, creating a fresh one if absent.
    async fn get_or_create_profile(&self, player: PlayerId)
        -> Result<ProfileRecord, PersistError>;

    async fn get_roster(&self, player: PlayerId) -> Result<Vec<HeroRecord>, PersistError>;

    async fn put_profile(
        &self,
        player: PlayerId,
        profile: &ProfileRecord,
    ) -> Result<(), PersistError>;

    /// Idempotent upsert keyed by hero id; records carry the active
    /// party ordinals. Returns the records as persisted so the caller
    /// can verify the echo.
    async fn put_roster(
        &self,
        player: PlayerId,
        heroes: &[HeroRecord],
    ) -> Result<Vec<HeroRecord>, PersistError>;

    /// Full-replace semantics.
    async fn put_inventory(
        &self,
        player: PlayerId,
        items: &[ItemRecord],
    ) -> Result<(), PersistError>;
}

// =============================================================================
// Push Channel Port
// =============================================================================

/// Callback invoked with the full record on every remote-side write.
pub type PushCallback = Box<dyn Fn(ProfileRecord) + Send + Sync>;

/// Push channel delivering full-record change payloads. At most one
/// active subscription per player per session.
#[cfg_attr(test, mockall::automock)]
pub trait PushChannelPort: Send + Sync {
    fn subscribe(&self, player: PlayerId, on_change: PushCallback) -> Result<(), PushError>;

    fn unsubscribe(&self, player: PlayerId);
}

// =============================================================================
// External game-system ports
// =============================================================================

/// Per-hero combat score; pure, supplied by the combat system.
#[cfg_attr(test, mockall::automock)]
pub trait HeroScorePort: Send + Sync {
    fn score(&self, hero: &Hero) -> u64;
}

// =============================================================================
// Clock / Random
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Uniform sample in `min..=max`.
    fn gen_range(&self, min: u32, max: u32) -> u32;
}
