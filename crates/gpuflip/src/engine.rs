//! Cadence state machine and corruption passes.
//!
//! The engine is ticked once per intercepted submission. It counts the submissions its profile
//! cares about and decides, purely from that counter, whether the current one should be preceded
//! by a corruption pass over every tracked buffer:
//!
//! ```text
//! WarmingUp --(calls >= warmup / first)--> Active --(burst only: calls > last)--> Dormant
//! ```
//!
//! A pass flips a handful of single bits per buffer. With snapshot restore enabled every pass
//! starts from the same known-good contents.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dump::dump_registry;
use crate::flip::{flip_random_bits, BitFlip};
use crate::memory::{BufferMemory, BufferMemoryError};
use crate::profile::{Cadence, FireAction, Profile, Seeding};
use crate::registry::{BufferDescriptor, BufferRegistry};
use crate::seed::{SeedSource, WallClockSeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    WarmingUp,
    Active,
    /// Terminal; the burst window has closed.
    Dormant,
}

/// How a buffer's contents were prepared before flipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// Snapshot/restore disabled; damage accumulates.
    Cumulative,
    /// First pass on this buffer: its contents were saved as the known-good copy.
    Captured,
    /// The known-good copy was written back, undoing the previous pass.
    Restored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPass {
    pub start: usize,
    pub length: usize,
    pub baseline: Baseline,
    pub flips: Vec<BitFlip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassReport {
    pub buffers: Vec<BufferPass>,
}

impl PassReport {
    pub fn flip_count(&self) -> usize {
        self.buffers.iter().map(|pass| pass.flips.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The selector is not one the profile counts; nothing changed.
    Filtered,
    Idle { call: u64, state: EngineState },
    Corrupted { call: u64, report: PassReport },
    Dumped { call: u64, files: Vec<PathBuf> },
}

impl TickOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::Dumped { .. })
    }
}

#[derive(Debug)]
pub struct CorruptionEngine<S = WallClockSeed> {
    profile: Profile,
    calls: u64,
    seeds: S,
    rng: Option<StdRng>,
    dump_dir: PathBuf,
}

impl<S: SeedSource> CorruptionEngine<S> {
    pub fn new(profile: Profile, seeds: S) -> Self {
        Self {
            profile,
            calls: 0,
            seeds,
            rng: None,
            dump_dir: PathBuf::from("."),
        }
    }

    /// Directory that [`FireAction::Dump`] writes into (default: the working directory).
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = dir.into();
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Submissions counted so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn state(&self) -> EngineState {
        state_at(self.profile.cadence, self.calls)
    }

    /// Account for one submission with `selector`, corrupting (or dumping) the tracked buffers if
    /// the cadence says this call fires.
    pub fn tick(
        &mut self,
        selector: u32,
        registry: &mut BufferRegistry,
        mem: &mut dyn BufferMemory,
    ) -> TickOutcome {
        if !self.profile.selectors.admits(selector) {
            return TickOutcome::Filtered;
        }

        self.calls += 1;
        let call = self.calls;
        let state = self.state();

        match self.profile.seeding {
            Seeding::Once if self.rng.is_none() => self.reseed(),
            Seeding::OutsideWindow if state != EngineState::Active => self.reseed(),
            _ => {}
        }

        if !self.fires(call, registry) {
            return TickOutcome::Idle { call, state };
        }

        match self.profile.action {
            FireAction::Corrupt => {
                tracing::info!(call, total = registry.len(), "corrupting GPU buffers");
                let report = self.corrupt(registry, mem);
                TickOutcome::Corrupted { call, report }
            }
            FireAction::Dump => {
                let files = dump_registry(&self.dump_dir, registry, mem);
                TickOutcome::Dumped { call, files }
            }
        }
    }

    fn fires(&self, call: u64, registry: &BufferRegistry) -> bool {
        match self.profile.cadence {
            Cadence::Persistent { warmup, period } => {
                call >= warmup && period != 0 && call % period == 0 && !registry.is_empty()
            }
            Cadence::Burst { first, last } => (first..=last).contains(&call),
        }
    }

    fn reseed(&mut self) {
        let seed = self.seeds.next_seed();
        tracing::trace!(seed, "seeding corruption PRNG");
        self.rng = Some(StdRng::seed_from_u64(seed));
    }

    fn corrupt(&mut self, registry: &mut BufferRegistry, mem: &mut dyn BufferMemory) -> PassReport {
        let profile = self.profile;
        let seeds = &mut self.seeds;
        let rng = self
            .rng
            .get_or_insert_with(|| StdRng::seed_from_u64(seeds.next_seed()));

        let mut report = PassReport::default();
        registry.for_each(|desc| {
            let baseline = if profile.restore_snapshots {
                match prepare_baseline(desc, mem) {
                    Ok(baseline) => baseline,
                    Err(err) => {
                        tracing::warn!(base = format_args!("0x{:x}", desc.start()), "{err}");
                        return;
                    }
                }
            } else {
                Baseline::Cumulative
            };

            let flips = match flip_random_bits(
                mem,
                desc,
                profile.window,
                profile.flip_bit_limit,
                profile.flips_per_buffer,
                rng,
            ) {
                Ok(flips) => flips,
                Err(err) => {
                    tracing::warn!(base = format_args!("0x{:x}", desc.start()), "{err}");
                    return;
                }
            };
            for flip in &flips {
                tracing::trace!(
                    addr = format_args!("0x{:x}", flip.addr),
                    bit = flip.bit,
                    before = format_args!("0x{:08x}", flip.before),
                    after = format_args!("0x{:08x}", flip.after),
                    "flipped bit"
                );
            }

            report.buffers.push(BufferPass {
                start: desc.start(),
                length: desc.length(),
                baseline,
                flips,
            });
        });
        report
    }
}

/// Capture the known-good copy on the first pass, restore it on every later one.
fn prepare_baseline(
    desc: &mut BufferDescriptor,
    mem: &mut dyn BufferMemory,
) -> Result<Baseline, BufferMemoryError> {
    if let Some(snapshot) = desc.snapshot() {
        mem.write(desc.start(), snapshot)?;
        return Ok(Baseline::Restored);
    }

    let mut copy = vec![0u8; desc.length()];
    mem.read(desc.start(), &mut copy)?;
    desc.capture_snapshot(copy.into_boxed_slice());
    Ok(Baseline::Captured)
}

fn state_at(cadence: Cadence, calls: u64) -> EngineState {
    match cadence {
        Cadence::Persistent { warmup, .. } if calls >= warmup => EngineState::Active,
        Cadence::Persistent { .. } => EngineState::WarmingUp,
        Cadence::Burst { first, .. } if calls < first => EngineState::WarmingUp,
        Cadence::Burst { last, .. } if calls <= last => EngineState::Active,
        Cadence::Burst { .. } => EngineState::Dormant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VecBufferMemory;
    use crate::seed::FixedSeed;

    /// Counts how often the engine asks for a seed.
    #[derive(Debug, Default)]
    struct CountingSeed(u64);

    impl SeedSource for CountingSeed {
        fn next_seed(&mut self) -> u64 {
            self.0 += 1;
            self.0
        }
    }

    #[test]
    fn persistent_states() {
        let cadence = Profile::PERSISTENT_CYCLIC.cadence;
        assert_eq!(state_at(cadence, 0), EngineState::WarmingUp);
        assert_eq!(state_at(cadence, 9), EngineState::WarmingUp);
        assert_eq!(state_at(cadence, 10), EngineState::Active);
        assert_eq!(state_at(cadence, 10_000), EngineState::Active);
    }

    #[test]
    fn burst_states() {
        let cadence = Profile::SINGLE_BURST.cadence;
        assert_eq!(state_at(cadence, 9), EngineState::WarmingUp);
        assert_eq!(state_at(cadence, 10), EngineState::Active);
        assert_eq!(state_at(cadence, 14), EngineState::Active);
        assert_eq!(state_at(cadence, 15), EngineState::Dormant);
    }

    #[test]
    fn persistent_profile_seeds_once() {
        let mut engine = CorruptionEngine::new(Profile::PERSISTENT_CYCLIC, CountingSeed::default());
        let mut registry = BufferRegistry::new(0x1000);
        let mut mem = VecBufferMemory::new(0x1000, 0x100);
        registry.register(0x1000, 0x100);

        for _ in 0..40 {
            engine.tick(0, &mut registry, &mut mem);
        }
        assert_eq!(engine.seeds.0, 1);
    }

    #[test]
    fn burst_profile_reseeds_outside_the_window() {
        let mut engine = CorruptionEngine::new(Profile::SINGLE_BURST, CountingSeed::default());
        let mut registry = BufferRegistry::new(0x1000);
        let mut mem = VecBufferMemory::new(0x1000, 0x100);

        for _ in 0..20 {
            engine.tick(0x1e, &mut registry, &mut mem);
        }
        // Calls 1..=9 and 15..=20.
        assert_eq!(engine.seeds.0, 15);
    }

    #[test]
    fn filtered_selectors_are_not_counted() {
        let mut engine = CorruptionEngine::new(Profile::SINGLE_BURST, FixedSeed(1));
        let mut registry = BufferRegistry::new(0x1000);
        let mut mem = VecBufferMemory::new(0x1000, 0x100);

        assert_eq!(
            engine.tick(0x0d, &mut registry, &mut mem),
            TickOutcome::Filtered
        );
        assert_eq!(engine.calls(), 0);
        assert_eq!(
            engine.tick(0x12, &mut registry, &mut mem),
            TickOutcome::Idle {
                call: 1,
                state: EngineState::WarmingUp
            }
        );
    }

    #[test]
    fn persistent_profile_waits_for_a_buffer() {
        let mut engine = CorruptionEngine::new(Profile::PERSISTENT_CYCLIC, FixedSeed(1));
        let mut registry = BufferRegistry::new(0x1000);
        let mut mem = VecBufferMemory::new(0x1000, 0x100);

        for _ in 0..12 {
            assert!(!engine.tick(0, &mut registry, &mut mem).fired());
        }
        registry.register(0x1000, 0x100);
        for call in 13..=16 {
            assert_eq!(engine.tick(0, &mut registry, &mut mem).fired(), call == 16);
        }
    }

    #[test]
    fn unreadable_buffer_is_skipped_without_aborting_the_pass() {
        let mut engine = CorruptionEngine::new(Profile::SINGLE_BURST, FixedSeed(3));
        let mut registry = BufferRegistry::new(0x1000);
        let mut mem = VecBufferMemory::new(0x1000, 0x100);
        // Not backed by `mem`.
        registry.register(0x9000, 0x100);
        registry.register(0x1000, 0x100);

        let mut last = None;
        for _ in 0..10 {
            last = Some(engine.tick(0, &mut registry, &mut mem));
        }
        let report = match last {
            Some(TickOutcome::Corrupted { call: 10, report }) => report,
            other => panic!("expected call 10 to corrupt, got {other:?}"),
        };
        assert_eq!(report.buffers.len(), 1);
        assert_eq!(report.buffers[0].start, 0x1000);
        assert_eq!(report.buffers[0].flips.len(), 128);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let run = || {
            let mut engine = CorruptionEngine::new(Profile::PERSISTENT_CYCLIC, FixedSeed(42));
            let mut registry = BufferRegistry::new(0x1000);
            let mut mem = VecBufferMemory::new(0x1000, 0x1000);
            registry.register(0x1000, 0x1000);
            for _ in 0..12 {
                engine.tick(0, &mut registry, &mut mem);
            }
            mem
        };
        assert_eq!(run().bytes(0x1000, 0x1000), run().bytes(0x1000, 0x1000));
    }
}
