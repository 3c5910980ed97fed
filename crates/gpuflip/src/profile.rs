//! Compile-time fuzzing profiles.
//!
//! Every threshold the engine uses lives in a [`Profile`]. Two profiles exist:
//! - [`Profile::PERSISTENT_CYCLIC`]: after a warm-up, fire on every fourth submission for the rest
//!   of the process, restoring each buffer to a known-good snapshot before flipping new bits.
//! - [`Profile::SINGLE_BURST`]: fire on a short window of command-buffer submissions only, letting
//!   the damage accumulate, then go dormant for good.

use core::ops::Range;

use crate::flip::WORD_BYTES;
use crate::registry::REGISTRY_CAPACITY;

/// `IOConnectCallMethod` selectors that submit command buffers on the accelerator user client.
pub const SUBMIT_COMMAND_BUFFER_SELECTORS: &[u32] = &[0x00, 0x09, 0x0a, 0x0b, 0x12, 0x1e];

/// Upper bound on tracked buffer sizes. Anything larger is almost certainly a misread handle.
pub const MAX_BUFFER_LEN: usize = 0x10_0000;

/// Only the low 24 bits of a word are ever flipped.
pub const FLIP_BIT_LIMIT: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Active from call `warmup` onward; fires on calls that are a multiple of `period`.
    Persistent { warmup: u64, period: u64 },
    /// Active for calls `first..=last` only, dormant afterwards.
    Burst { first: u64, last: u64 },
}

/// When the PRNG is (re)seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeding {
    /// Once, on the first counted call.
    Once,
    /// On every counted call outside the active window.
    OutsideWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorFilter {
    Any,
    AllowList(&'static [u32]),
}

impl SelectorFilter {
    pub fn admits(&self, selector: u32) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(selectors) => selectors.contains(&selector),
        }
    }
}

/// What happens to the tracked buffers when the cadence fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireAction {
    Corrupt,
    /// Write each buffer to disk instead of corrupting it.
    Dump,
}

/// Byte window, relative to a buffer's base, that bit flips are confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipWindow {
    pub base_offset: usize,
    pub size: usize,
}

impl FlipWindow {
    /// Word indices a flip may target in a buffer of `buffer_len` bytes, or `None` if the window
    /// does not overlap a single whole word of the buffer.
    pub fn word_range(&self, buffer_len: usize) -> Option<Range<usize>> {
        let end = self.base_offset.saturating_add(self.size).min(buffer_len);
        let first = self.base_offset.div_ceil(WORD_BYTES);
        let last = end / WORD_BYTES;
        (first < last).then_some(first..last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub cadence: Cadence,
    pub seeding: Seeding,
    pub selectors: SelectorFilter,
    /// Restore each buffer from its snapshot before a pass (capturing it on the first pass).
    pub restore_snapshots: bool,
    pub flips_per_buffer: usize,
    pub window: FlipWindow,
    pub flip_bit_limit: u32,
    pub registry_capacity: usize,
    pub max_buffer_len: usize,
    /// Only track unified-memory resources that are not yet mapped into the GPU address space.
    pub require_unmapped_gpu_va: bool,
    pub action: FireAction,
}

impl Profile {
    pub const PERSISTENT_CYCLIC: Profile = Profile {
        name: "persistent-cyclic",
        cadence: Cadence::Persistent {
            warmup: 10,
            period: 4,
        },
        seeding: Seeding::Once,
        selectors: SelectorFilter::Any,
        restore_snapshots: true,
        flips_per_buffer: 32,
        window: FlipWindow {
            base_offset: 0,
            size: 0x9000,
        },
        flip_bit_limit: FLIP_BIT_LIMIT,
        registry_capacity: REGISTRY_CAPACITY,
        max_buffer_len: MAX_BUFFER_LEN,
        require_unmapped_gpu_va: true,
        action: FireAction::Corrupt,
    };

    pub const SINGLE_BURST: Profile = Profile {
        name: "single-burst",
        cadence: Cadence::Burst { first: 10, last: 14 },
        seeding: Seeding::OutsideWindow,
        selectors: SelectorFilter::AllowList(SUBMIT_COMMAND_BUFFER_SELECTORS),
        restore_snapshots: false,
        flips_per_buffer: 128,
        window: FlipWindow {
            base_offset: 0,
            size: 0x1900,
        },
        flip_bit_limit: FLIP_BIT_LIMIT,
        registry_capacity: REGISTRY_CAPACITY,
        max_buffer_len: MAX_BUFFER_LEN,
        require_unmapped_gpu_va: false,
        action: FireAction::Corrupt,
    };

    pub const fn with_action(mut self, action: FireAction) -> Self {
        self.action = action;
        self
    }

    /// Whether a unified-memory resource with the given GPU virtual address should be tracked.
    pub fn tracks_gpu_va(&self, gpu_va: u64) -> bool {
        !self.require_unmapped_gpu_va || gpu_va == 0
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::PERSISTENT_CYCLIC
    }
}
