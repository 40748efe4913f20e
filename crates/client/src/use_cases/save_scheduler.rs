//! Debounced persistence with a single-slot in-flight queue.
//!
//! Mutation notifications restart a debounce timer; when it settles, the
//! then-current snapshot is flushed to the persistence service. At most
//! one flush is in flight at a time: the ticket is taken synchronously
//! before any asynchronous work, and a second requester awaits the
//! holder and then re-reads the current snapshot (last-write-wins at
//! flush time, not at request time).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use emberfall_domain::Snapshot;
use emberfall_protocol::{HeroRecord, ItemRecord, ProfileRecord};

use crate::infrastructure::ports::{ClockPort, PersistError, PersistencePort};
use crate::stores::StateStore;

/// Persistence status surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Saving,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_saved_at: None,
            last_error: None,
        }
    }
}

pub struct SaveScheduler {
    state: Arc<StateStore>,
    persistence: Arc<dyn PersistencePort>,
    clock: Arc<dyn ClockPort>,
    debounce: Duration,
    bulk_guard: chrono::Duration,
    /// The save ticket: holding this guard is the mutual-exclusion
    /// primitive for in-flight persistence.
    in_flight: tokio::sync::Mutex<()>,
    pending: std::sync::Mutex<Option<JoinHandle<()>>>,
    last_bulk_update: std::sync::Mutex<Option<DateTime<Utc>>>,
    sync_state: std::sync::Mutex<SyncState>,
}

impl SaveScheduler {
    pub fn new(
        state: Arc<StateStore>,
        persistence: Arc<dyn PersistencePort>,
        clock: Arc<dyn ClockPort>,
        debounce: Duration,
        bulk_guard: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            persistence,
            clock,
            debounce,
            bulk_guard: chrono::Duration::milliseconds(bulk_guard.as_millis() as i64),
            in_flight: tokio::sync::Mutex::new(()),
            pending: std::sync::Mutex::new(None),
            last_bulk_update: std::sync::Mutex::new(None),
            sync_state: std::sync::Mutex::new(SyncState::default()),
        })
    }

    /// (Re)start the debounce timer. `snapshot` pins the exact state to
    /// flush; `None` means "whatever is current when the timer settles".
    ///
    /// A snapshot-less request arriving inside the bulk-update guard
    /// window is skipped: the ambient snapshot may predate the bulk
    /// mutation, and the bulk path always notifies with an explicit
    /// snapshot of its own.
    pub fn notify(self: &Arc<Self>, snapshot: Option<Snapshot>) {
        if snapshot.is_none() && self.within_bulk_guard() {
            tracing::debug!("auto-save inside bulk-update guard window, skipping");
            return;
        }
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            this.persist(snapshot).await;
        });
        let mut pending = self.pending.lock().expect("pending lock poisoned");
        if let Some(old) = pending.replace(handle) {
            old.abort();
        }
    }

    /// Cancel any pending timer and flush immediately. Returns once the
    /// flush has completed (or failed); used before operations that need
    /// a guaranteed-fresh remote copy.
    pub async fn save_now(&self) {
        self.cancel_pending();
        self.persist(None).await;
    }

    /// Record that a bulk roster mutation just happened; see [`Self::notify`].
    pub fn mark_bulk_update(&self) {
        *self
            .last_bulk_update
            .lock()
            .expect("bulk timestamp lock poisoned") = Some(self.clock.now());
    }

    /// Cancel the pending debounce timer, if any. Called on teardown.
    pub fn cancel_pending(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .expect("pending lock poisoned")
            .take()
        {
            handle.abort();
        }
    }

    /// Current persistence status for UI purposes.
    pub fn sync_state(&self) -> SyncState {
        self.sync_state
            .lock()
            .expect("sync state lock poisoned")
            .clone()
    }

    fn within_bulk_guard(&self) -> bool {
        let last = *self
            .last_bulk_update
            .lock()
            .expect("bulk timestamp lock poisoned");
        match last {
            Some(ts) => self.clock.now() - ts <= self.bulk_guard,
            None => false,
        }
    }

    fn set_sync_state(&self, update: impl FnOnce(&mut SyncState)) {
        let mut state = self.sync_state.lock().expect("sync state lock poisoned");
        update(&mut state);
    }

    async fn persist(&self, snapshot: Option<Snapshot>) {
        // Ticket acquisition is the first thing that happens, before any
        // asynchronous work. A second requester parks on the mutex and,
        // once through, discards its (now stale) requested snapshot in
        // favor of the state current at flush time.
        let (_ticket, snapshot) = match self.in_flight.try_lock() {
            Ok(guard) => (guard, snapshot),
            Err(_) => {
                let guard = self.in_flight.lock().await;
                (guard, None)
            }
        };
        let snapshot = match snapshot {
            Some(snap) => snap,
            None => self.state.current().await,
        };

        self.set_sync_state(|s| s.status = SyncStatus::Saving);
        match self.flush(&snapshot).await {
            Ok(()) => {
                let now = self.clock.now();
                self.set_sync_state(|s| {
                    s.status = SyncStatus::Success;
                    s.last_saved_at = Some(now);
                    s.last_error = None;
                });
                tracing::debug!(revision = snapshot.revision, "snapshot persisted");
            }
            Err(e) => {
                // No automatic retry; the next mutation or an explicit
                // manual save is the retry path.
                tracing::warn!(error = %e, "persistence failed");
                self.set_sync_state(|s| {
                    s.status = SyncStatus::Error;
                    s.last_error = Some(e.to_string());
                });
            }
        }
        // The ticket guard drops here, success or failure alike.
    }

    async fn flush(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let player = snapshot.identity;
        let profile = ProfileRecord::from_snapshot(snapshot, self.clock.now());
        self.persistence.put_profile(player, &profile).await?;

        let records: Vec<HeroRecord> = snapshot
            .heroes
            .iter()
            .map(|h| HeroRecord::from(h).with_ordinal(snapshot.party.ordinal_of(h.id)))
            .collect();
        let echo = self.persistence.put_roster(player, &records).await?;
        verify_roster_echo(&records, &echo);

        let items: Vec<ItemRecord> = snapshot.inventory.iter().map(ItemRecord::from).collect();
        self.persistence.put_inventory(player, &items).await?;
        Ok(())
    }
}

/// Compare what was sent against what the store reports as persisted.
/// Divergence is a diagnostic signal, not a save failure.
fn verify_roster_echo(sent: &[HeroRecord], persisted: &[HeroRecord]) {
    for record in sent {
        let Some(echo) = persisted.iter().find(|p| p.id == record.id) else {
            tracing::error!(hero = %record.id, "persisted roster is missing a sent hero");
            continue;
        };
        if echo.experience != record.experience || echo.hit_points != record.hit_points {
            tracing::error!(
                hero = %record.id,
                sent_experience = record.experience,
                persisted_experience = echo.experience,
                sent_hit_points = record.hit_points,
                persisted_hit_points = echo.hit_points,
                "persisted hero diverges from sent values"
            );
        }
    }
}
