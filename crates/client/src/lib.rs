//! Emberfall client session core.
//!
//! Owns the canonical in-memory session snapshot and keeps it in sync
//! with the remote persistence service: debounced saves, duplicate-safe
//! initial loads, field-ownership merging of push-channel events, and a
//! periodic world simulation tick.

pub mod config;
pub mod infrastructure;
pub mod session;
pub mod stores;
pub mod use_cases;

pub use config::SessionConfig;
pub use session::Session;
pub use stores::StateStore;
