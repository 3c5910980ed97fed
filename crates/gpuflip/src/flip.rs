//! Single-bit corruption of 32-bit words.

use rand::Rng;

use crate::memory::{BufferMemory, BufferMemoryError};
use crate::profile::FlipWindow;
use crate::registry::BufferDescriptor;

pub const WORD_BYTES: usize = 4;

/// One applied bit flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitFlip {
    /// Address of the flipped word.
    pub addr: usize,
    /// Byte offset of the word from the buffer base; always word-aligned.
    pub offset: usize,
    pub bit: u32,
    pub before: u32,
    pub after: u32,
}

impl BitFlip {
    pub fn mask(&self) -> u32 {
        1 << self.bit
    }
}

/// XOR bit `bit` into the word at `base + offset`.
pub fn flip_bit(
    mem: &mut dyn BufferMemory,
    base: usize,
    offset: usize,
    bit: u32,
) -> Result<BitFlip, BufferMemoryError> {
    debug_assert!(bit < u32::BITS);
    debug_assert_eq!(offset % WORD_BYTES, 0);

    let addr = base
        .checked_add(offset)
        .ok_or(BufferMemoryError::OutOfBounds {
            addr: base,
            len: offset.saturating_add(WORD_BYTES),
        })?;
    let before = mem.read_u32(addr)?;
    let after = before ^ (1 << bit);
    mem.write_u32(addr, after)?;
    Ok(BitFlip {
        addr,
        offset,
        bit,
        before,
        after,
    })
}

/// Apply `count` random single-bit flips to `desc`, each on a uniformly chosen word inside
/// `window` (clipped to the buffer) and a uniformly chosen bit below `bit_limit`.
///
/// Flips may land on the same word more than once. Buffers too small to hold a whole word of
/// the window are left alone.
pub fn flip_random_bits<R>(
    mem: &mut dyn BufferMemory,
    desc: &BufferDescriptor,
    window: FlipWindow,
    bit_limit: u32,
    count: usize,
    rng: &mut R,
) -> Result<Vec<BitFlip>, BufferMemoryError>
where
    R: Rng + ?Sized,
{
    let Some(words) = window.word_range(desc.length()) else {
        return Ok(Vec::new());
    };
    let bit_limit = bit_limit.clamp(1, u32::BITS);

    let mut flips = Vec::with_capacity(count);
    for _ in 0..count {
        let index = rng.gen_range(words.clone());
        let bit = rng.gen_range(0..bit_limit);
        flips.push(flip_bit(mem, desc.start(), index * WORD_BYTES, bit)?);
    }
    Ok(flips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VecBufferMemory;
    use crate::registry::BufferRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn flip_bit_toggles_exactly_one_bit() {
        let mut mem = VecBufferMemory::new(0x1000, 0x10);
        mem.write_u32(0x1008, 0xFFFF_0000).unwrap();

        let flip = flip_bit(&mut mem, 0x1000, 8, 3).unwrap();
        assert_eq!(flip.addr, 0x1008);
        assert_eq!(flip.before, 0xFFFF_0000);
        assert_eq!(flip.after, 0xFFFF_0008);
        assert_eq!(mem.read_u32(0x1008).unwrap(), 0xFFFF_0008);

        // Flipping the same bit again undoes it.
        flip_bit(&mut mem, 0x1000, 8, 3).unwrap();
        assert_eq!(mem.read_u32(0x1008).unwrap(), 0xFFFF_0000);
    }

    #[test]
    fn tiny_buffers_are_skipped() {
        let mut mem = VecBufferMemory::new(0x1000, 0x10);
        let mut registry = BufferRegistry::new(0x100);
        registry.register(0x1000, 3);
        let desc = registry.get(0).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let window = FlipWindow {
            base_offset: 0,
            size: 0x9000,
        };
        let flips = flip_random_bits(&mut mem, desc, window, 24, 32, &mut rng).unwrap();
        assert!(flips.is_empty());
        assert_eq!(mem.bytes(0x1000, 0x10).unwrap(), &[0u8; 0x10][..]);
    }

    #[test]
    fn random_flips_stay_in_the_window() {
        let mut mem = VecBufferMemory::new(0x4000, 0x2000);
        let mut registry = BufferRegistry::new(0x2000);
        registry.register(0x4000, 0x2000);
        let desc = registry.get(0).unwrap();
        let window = FlipWindow {
            base_offset: 0x100,
            size: 0x40,
        };

        let mut rng = StdRng::seed_from_u64(1);
        let flips = flip_random_bits(&mut mem, desc, window, 24, 256, &mut rng).unwrap();
        assert_eq!(flips.len(), 256);
        for flip in &flips {
            assert!((0x100..0x140).contains(&flip.offset), "{flip:?}");
            assert_eq!(flip.offset % WORD_BYTES, 0);
            assert!(flip.bit < 24);
            assert_eq!(flip.before ^ flip.after, flip.mask());
        }

        let outside = mem
            .bytes(0x4000, 0x2000)
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(i, b)| !(0x100..0x140).contains(i) && **b != 0)
            .count();
        assert_eq!(outside, 0);
    }
}
