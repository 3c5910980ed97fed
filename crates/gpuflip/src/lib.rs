//! Bit-flip fault injection for GPU-visible buffers.
//!
//! The allocation hooks feed buffers into a [`BufferRegistry`]; the submission hook ticks a
//! [`CorruptionEngine`], which on a fixed cadence flips single bits inside those buffers before
//! the real submission reaches the driver. Everything here is platform independent: buffer
//! contents are reached through the [`BufferMemory`] trait, so the same engine runs against
//! driver-owned memory in `gpuflip-interpose` and against a [`VecBufferMemory`] in tests.
//!
//! The crate is organised as:
//! 1. **Registry** (`registry`): fixed-capacity, append-only list of tracked buffers plus their
//!    known-good snapshots.
//! 2. **Profiles** (`profile`): the compile-time thresholds of the two cadence policies.
//! 3. **Engine** (`engine`, `flip`): the cadence state machine and the single-bit corruption
//!    pass.
//! 4. **Diagnostics** (`dump`, `hexdump`): raw buffer dumps and hex previews.

#![forbid(unsafe_code)]

pub mod dump;
pub mod engine;
pub mod flip;
pub mod fuzzer;
pub mod hexdump;
pub mod memory;
pub mod profile;
pub mod registry;
pub mod seed;

pub use dump::{dump_buffer, dump_file_name, dump_registry, DumpError};
pub use engine::{
    Baseline, BufferPass, CorruptionEngine, EngineState, PassReport, TickOutcome,
};
pub use flip::{flip_bit, flip_random_bits, BitFlip, WORD_BYTES};
pub use fuzzer::Fuzzer;
pub use hexdump::hex_preview;
pub use memory::{BufferMemory, BufferMemoryError, VecBufferMemory};
pub use profile::{
    Cadence, FireAction, FlipWindow, Profile, Seeding, SelectorFilter, MAX_BUFFER_LEN,
    SUBMIT_COMMAND_BUFFER_SELECTORS,
};
pub use registry::{BufferDescriptor, BufferRegistry, RegisterRejection, REGISTRY_CAPACITY};
pub use seed::{FixedSeed, SeedSource, WallClockSeed};
