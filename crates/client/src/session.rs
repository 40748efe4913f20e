//! Session composition root.
//!
//! Wires the state store, save scheduler, load reconciler, realtime
//! merge filter and world ticker together for one player, and owns the
//! background tasks (push pump, world ticker) for the session's
//! lifetime.

use std::sync::Arc;

use tokio::task::JoinHandle;

use emberfall_domain::{default_spawn_catalog, PlayerId, Snapshot};

use crate::config::SessionConfig;
use crate::infrastructure::ports::{
    ClockPort, HeroScorePort, PersistencePort, PushChannelPort, PushError, RandomPort,
};
use crate::stores::StateStore;
use crate::use_cases::actions::GameActions;
use crate::use_cases::load_reconciler::LoadReconciler;
use crate::use_cases::realtime_merge::RealtimeMergeFilter;
use crate::use_cases::save_scheduler::{SaveScheduler, SyncState};
use crate::use_cases::world_tick::WorldTickService;

pub struct Session {
    player: PlayerId,
    state: Arc<StateStore>,
    scheduler: Arc<SaveScheduler>,
    reconciler: Arc<LoadReconciler>,
    merge: Arc<RealtimeMergeFilter>,
    push: Arc<dyn PushChannelPort>,
    actions: GameActions,
    tick_interval: std::time::Duration,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        player: PlayerId,
        persistence: Arc<dyn PersistencePort>,
        push: Arc<dyn PushChannelPort>,
        scorer: Arc<dyn HeroScorePort>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let state = Arc::new(StateStore::new(player, scorer));
        let scheduler = SaveScheduler::new(
            Arc::clone(&state),
            Arc::clone(&persistence),
            Arc::clone(&clock),
            config.debounce,
            config.bulk_guard,
        );
        // Every save-relevant transform pings the scheduler. Bulk paths
        // notify with an explicit snapshot on top of this.
        {
            let scheduler = Arc::clone(&scheduler);
            state.set_dirty_hook(Box::new(move || scheduler.notify(None)));
        }
        let reconciler = Arc::new(LoadReconciler::new(
            Arc::clone(&state),
            persistence,
            config.overlap,
        ));
        let merge = Arc::new(RealtimeMergeFilter::new(Arc::clone(&state)));
        let world_tick = Arc::new(WorldTickService::new(
            random,
            default_spawn_catalog(),
            config.world_tick,
        ));
        let actions = GameActions::new(
            player,
            Arc::clone(&state),
            Arc::clone(&scheduler),
            Arc::clone(&reconciler),
            world_tick,
            clock,
        );

        Arc::new(Self {
            player,
            state,
            scheduler,
            reconciler,
            merge,
            push,
            actions,
            tick_interval: config.tick_interval,
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Run the initial load, subscribe to the push channel, and start
    /// the world ticker. Returns the post-load snapshot.
    ///
    /// Push payloads are pumped through an unbounded channel so the
    /// (synchronous) subscription callback never blocks on the state
    /// lock.
    pub async fn start(self: &Arc<Self>) -> Result<Snapshot, PushError> {
        let snapshot = self.reconciler.load(self.player).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        self.push.subscribe(
            self.player,
            Box::new(move |payload| {
                // Receiver dropped means the session is shutting down.
                let _ = tx.send(payload);
            }),
        )?;
        let merge = Arc::clone(&self.merge);
        let pump = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                merge.on_remote_change(payload).await;
            }
        });

        let session = Arc::clone(self);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(session.tick_interval);
            loop {
                interval.tick().await;
                session.actions.run_world_tick().await;
            }
        });

        self.tasks
            .lock()
            .expect("tasks lock poisoned")
            .extend([pump, ticker]);
        tracing::info!(player = %self.player, "session started");
        Ok(snapshot)
    }

    pub fn actions(&self) -> &GameActions {
        &self.actions
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.current().await
    }

    pub fn sync_state(&self) -> SyncState {
        self.scheduler.sync_state()
    }

    /// Flush outstanding changes, stop the background tasks, and drop
    /// the push subscription.
    pub async fn shutdown(&self) {
        self.scheduler.save_now().await;
        self.scheduler.cancel_pending();
        for task in self
            .tasks
            .lock()
            .expect("tasks lock poisoned")
            .drain(..)
        {
            task.abort();
        }
        self.push.unsubscribe(self.player);
        tracing::info!(player = %self.player, "session shut down");
    }
}
