//! Field-ownership merge for push-channel events.
//!
//! The push channel fires on any write to the backing record, including
//! this client's own debounced save. Taking local-authoritative fields
//! from a push would create a feedback loop that visibly regresses
//! recently applied local changes (energy jumping backward, roster
//! entries vanishing) because of the lag between the write and its
//! read-back. The merge therefore takes remote-authoritative fields
//! from the payload, keeps local-authoritative fields untouched, and
//! recomputes derived fields from the payload's tier rather than
//! trusting its cached copies.

use std::sync::Arc;

use emberfall_domain::Snapshot;
use emberfall_protocol::ProfileRecord;

use crate::stores::StateStore;

pub struct RealtimeMergeFilter {
    state: Arc<StateStore>,
}

impl RealtimeMergeFilter {
    pub fn new(state: Arc<StateStore>) -> Self {
        Self { state }
    }

    /// Incorporate one push-channel payload.
    pub async fn on_remote_change(&self, payload: ProfileRecord) {
        tracing::debug!(player = %payload.player_id, "applying push-channel payload");
        self.state
            .apply(move |local| merge_remote(local, &payload))
            .await;
    }
}

/// Ownership table:
/// - remote wins: display name, tier, gold, gems, discovered locations,
///   cooldowns, created-at
/// - local wins (payload ignored): energy, roster, active party, world
///   map and objects, inventory
/// - derived (recomputed, never copied): max energy, combat power
fn merge_remote(local: Snapshot, remote: &ProfileRecord) -> Snapshot {
    let mut snap = local;
    snap.display_name = remote.display_name.clone();
    snap.tier = remote.tier;
    snap.resources.gold = remote.gold;
    snap.resources.gems = remote.gems;
    snap.discovered_locations = remote.discovered_locations.iter().cloned().collect();
    snap.cooldowns = remote.cooldowns.clone();
    snap.created_at = Some(remote.created_at);
    // Max energy follows the payload's tier, not its cached max_energy;
    // the store's derived recompute clamps energy afterwards.
    snap.resources.recompute_max_energy(snap.tier);
    snap
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::infrastructure::ports::{HeroScorePort, MockHeroScorePort};
    use emberfall_domain::{AccountTier, ActiveParty, Hero, HeroClass, PlayerId};

    fn test_store() -> Arc<StateStore> {
        let mut scorer = MockHeroScorePort::new();
        scorer.expect_score().returning(|_| 5);
        Arc::new(StateStore::new(
            PlayerId::new(),
            Arc::new(scorer) as Arc<dyn HeroScorePort>,
        ))
    }

    fn payload_for(store_player: PlayerId) -> ProfileRecord {
        ProfileRecord::new(store_player.to_uuid(), Utc::now())
    }

    #[tokio::test]
    async fn remote_gold_overwrites_but_lower_energy_is_ignored() {
        let store = test_store();
        let player = store.current().await.identity;
        store
            .apply(|mut s| {
                s.resources.gold = 10;
                s.resources.energy = 80;
                s
            })
            .await;

        let mut payload = payload_for(player);
        payload.gold = 9_999;
        payload.energy = 5; // stale read-back of an earlier save

        let filter = RealtimeMergeFilter::new(Arc::clone(&store));
        filter.on_remote_change(payload).await;

        let snap = store.current().await;
        assert_eq!(snap.resources.gold, 9_999);
        assert_eq!(snap.resources.energy, 80);
    }

    #[tokio::test]
    async fn roster_and_party_survive_push_payloads() {
        let store = test_store();
        let player = store.current().await.identity;
        store
            .apply(|mut s| {
                s.heroes = vec![Hero::new("Brandt", HeroClass::Warrior)];
                s.party = ActiveParty::sanitized(s.heroes.iter().map(|h| h.id), &s.heroes);
                s
            })
            .await;

        let filter = RealtimeMergeFilter::new(Arc::clone(&store));
        filter.on_remote_change(payload_for(player)).await;

        let snap = store.current().await;
        assert_eq!(snap.heroes.len(), 1);
        assert_eq!(snap.party.len(), 1);
    }

    #[tokio::test]
    async fn max_energy_recomputed_from_payload_tier_not_cached_copy() {
        let store = test_store();
        let player = store.current().await.identity;

        let mut payload = payload_for(player);
        payload.tier = AccountTier::Gold;
        payload.max_energy = 9_000; // cached copy must not be trusted

        let filter = RealtimeMergeFilter::new(Arc::clone(&store));
        filter.on_remote_change(payload).await;

        let snap = store.current().await;
        assert_eq!(snap.tier, AccountTier::Gold);
        assert_eq!(snap.resources.max_energy, 150);
    }

    #[tokio::test]
    async fn tier_downgrade_via_push_clamps_energy() {
        let store = test_store();
        let player = store.current().await.identity;
        store
            .apply(|mut s| {
                s.tier = AccountTier::Platinum;
                s.resources.recompute_max_energy(s.tier);
                s.resources.energy = 180;
                s
            })
            .await;

        let mut payload = payload_for(player);
        payload.tier = AccountTier::Standard;

        let filter = RealtimeMergeFilter::new(Arc::clone(&store));
        filter.on_remote_change(payload).await;

        let snap = store.current().await;
        assert_eq!(snap.resources.max_energy, 100);
        assert_eq!(snap.resources.energy, 100);
    }
}
