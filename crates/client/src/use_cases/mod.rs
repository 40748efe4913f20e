pub mod actions;
pub mod load_reconciler;
pub mod realtime_merge;
pub mod save_scheduler;
pub mod world_tick;
