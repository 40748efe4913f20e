//! Session configuration.
//!
//! Reference values come straight from the design defaults; every knob
//! can be overridden through `EMBERFALL_*` environment variables.

use std::time::Duration;

/// Debounce window before an auto-save flushes.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

/// Guard window after a bulk roster update during which snapshot-less
/// auto-save requests are skipped.
pub const DEFAULT_BULK_GUARD_MS: u64 = 1_000;

/// World simulation tick interval.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 300;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Duplicate-load detection thresholds. Empirically chosen policy, not
/// invariants; hold them here so deployments can tune them.
#[derive(Debug, Clone, Copy)]
pub struct OverlapPolicy {
    /// Above this overlap ratio a fetched roster is a duplicate load.
    pub duplicate_threshold: f64,
    /// Above this (and at most `duplicate_threshold`) the fetch merges
    /// as a partial addition.
    pub partial_threshold: f64,
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.80,
            partial_threshold: 0.30,
        }
    }
}

impl OverlapPolicy {
    /// Allowed roster size drift for the duplicate/merge paths.
    pub fn max_size_delta(&self, fetched_len: usize) -> usize {
        2.max((0.2 * fetched_len as f64).ceil() as usize)
    }
}

/// World tick population targets.
#[derive(Debug, Clone, Copy)]
pub struct WorldTickConfig {
    /// Desired number of active expiring objects.
    pub target_population: usize,
    /// Tile-sampling attempts per missing spawn before giving up.
    pub spawn_attempts: u32,
    /// Lifetime granted to a newly spawned expiring object.
    pub lifetime_secs: u32,
}

impl Default for WorldTickConfig {
    fn default() -> Self {
        Self {
            target_population: 12,
            spawn_attempts: 16,
            lifetime_secs: 4 * 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub bulk_guard: Duration,
    pub tick_interval: Duration,
    pub overlap: OverlapPolicy,
    pub world_tick: WorldTickConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            bulk_guard: Duration::from_millis(DEFAULT_BULK_GUARD_MS),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            overlap: OverlapPolicy::default(),
            world_tick: WorldTickConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `EMBERFALL_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            debounce: Duration::from_millis(env_u64(
                "EMBERFALL_DEBOUNCE_MS",
                DEFAULT_DEBOUNCE_MS,
            )),
            bulk_guard: Duration::from_millis(env_u64(
                "EMBERFALL_BULK_GUARD_MS",
                DEFAULT_BULK_GUARD_MS,
            )),
            tick_interval: Duration::from_secs(env_u64(
                "EMBERFALL_TICK_INTERVAL_SECS",
                DEFAULT_TICK_INTERVAL_SECS,
            )),
            overlap: OverlapPolicy {
                duplicate_threshold: env_f64(
                    "EMBERFALL_DUPLICATE_OVERLAP",
                    defaults.overlap.duplicate_threshold,
                ),
                partial_threshold: env_f64(
                    "EMBERFALL_PARTIAL_OVERLAP",
                    defaults.overlap.partial_threshold,
                ),
            },
            world_tick: WorldTickConfig {
                target_population: env_u64(
                    "EMBERFALL_TICK_TARGET_POPULATION",
                    defaults.world_tick.target_population as u64,
                ) as usize,
                spawn_attempts: env_u64(
                    "EMBERFALL_TICK_SPAWN_ATTEMPTS",
                    defaults.world_tick.spawn_attempts as u64,
                ) as u32,
                lifetime_secs: env_u64(
                    "EMBERFALL_TICK_LIFETIME_SECS",
                    defaults.world_tick.lifetime_secs as u64,
                ) as u32,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_delta_floors_at_two() {
        let policy = OverlapPolicy::default();
        assert_eq!(policy.max_size_delta(4), 2);
        assert_eq!(policy.max_size_delta(11), 3);
        assert_eq!(policy.max_size_delta(30), 6);
    }

    #[test]
    fn from_env_overrides_world_tick_knobs() {
        std::env::set_var("EMBERFALL_TICK_TARGET_POPULATION", "20");
        std::env::set_var("EMBERFALL_TICK_SPAWN_ATTEMPTS", "4");
        let config = SessionConfig::from_env();
        std::env::remove_var("EMBERFALL_TICK_TARGET_POPULATION");
        std::env::remove_var("EMBERFALL_TICK_SPAWN_ATTEMPTS");

        assert_eq!(config.world_tick.target_population, 20);
        assert_eq!(config.world_tick.spawn_attempts, 4);
        // Untouched knobs keep their defaults.
        assert_eq!(config.world_tick.lifetime_secs, 4 * 3600);
        assert_eq!(config.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }
}
