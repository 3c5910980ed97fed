use std::time::{SystemTime, UNIX_EPOCH};

/// Source of PRNG seeds for the corruption engine.
pub trait SeedSource {
    fn next_seed(&mut self) -> u64;
}

/// Seeds from the wall clock at one-second resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClockSeed;

impl SeedSource for WallClockSeed {
    fn next_seed(&mut self) -> u64 {
        unix_seconds()
    }
}

/// Always hands out the same seed; makes corruption passes reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSeed(pub u64);

impl SeedSource for FixedSeed {
    fn next_seed(&mut self) -> u64 {
        self.0
    }
}

pub(crate) fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
