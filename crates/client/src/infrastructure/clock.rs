//! Clock and random implementations.

use chrono::{DateTime, Utc};

use crate::infrastructure::ports::{ClockPort, RandomPort};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: u32, max: u32) -> u32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Deterministic random for testing: returns queued values in order,
/// then repeats the last one.
#[cfg(test)]
pub struct StepRandom(pub std::sync::Mutex<Vec<u32>>);

#[cfg(test)]
impl StepRandom {
    pub fn new(values: Vec<u32>) -> Self {
        Self(std::sync::Mutex::new(values))
    }
}

#[cfg(test)]
impl RandomPort for StepRandom {
    fn gen_range(&self, min: u32, max: u32) -> u32 {
        let mut values = self.0.lock().expect("lock poisoned");
        let value = if values.len() > 1 {
            values.remove(0)
        } else {
            values.first().copied().unwrap_or(min)
        };
        value.clamp(min, max)
    }
}
