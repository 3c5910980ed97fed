use std::path::PathBuf;

use crate::engine::{CorruptionEngine, TickOutcome};
use crate::memory::BufferMemory;
use crate::profile::Profile;
use crate::registry::{BufferDescriptor, BufferRegistry};
use crate::seed::{SeedSource, WallClockSeed};

/// All per-process fuzzing state: the tracked buffers and the cadence/corruption engine.
///
/// Constructed once and owned by whatever installs the hooks.
#[derive(Debug)]
pub struct Fuzzer<S = WallClockSeed> {
    registry: BufferRegistry,
    engine: CorruptionEngine<S>,
}

impl Fuzzer<WallClockSeed> {
    pub fn with_profile(profile: Profile) -> Self {
        Self::new(profile, WallClockSeed)
    }
}

impl<S: SeedSource> Fuzzer<S> {
    pub fn new(profile: Profile, seeds: S) -> Self {
        Self {
            registry: BufferRegistry::with_capacity(
                profile.registry_capacity,
                profile.max_buffer_len,
            ),
            engine: CorruptionEngine::new(profile, seeds),
        }
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.engine = self.engine.with_dump_dir(dir);
        self
    }

    pub fn profile(&self) -> &Profile {
        self.engine.profile()
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &CorruptionEngine<S> {
        &self.engine
    }

    pub fn register(&mut self, start: usize, length: usize) -> bool {
        self.registry.register(start, length)
    }

    pub fn tick(&mut self, selector: u32, mem: &mut dyn BufferMemory) -> TickOutcome {
        self.engine.tick(selector, &mut self.registry, mem)
    }

    pub fn for_each<F>(&mut self, visitor: F)
    where
        F: FnMut(&mut BufferDescriptor),
    {
        self.registry.for_each(visitor);
    }
}
