#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

use gpuflip::{
    BufferMemory, FixedSeed, Fuzzer, Profile, TickOutcome, VecBufferMemory, WORD_BYTES,
};

const MEM_BASE: usize = 0x7f00_0000;
const MEM_SIZE: usize = 0x4000;
const MAX_OPS: usize = 256;

#[derive(Debug, Arbitrary)]
enum Op {
    /// Register `[MEM_BASE + offset, +len)`; may point past the end of backing memory.
    Register { offset: u16, len: u32 },
    Tick { selector: u8 },
    Poke { offset: u16, value: u8 },
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(burst) = u.arbitrary::<bool>() else {
        return;
    };
    let Ok(seed) = u.arbitrary::<u64>() else {
        return;
    };
    let profile = if burst {
        Profile::SINGLE_BURST
    } else {
        Profile::PERSISTENT_CYCLIC
    };

    let mut fuzzer = Fuzzer::new(profile, FixedSeed(seed));
    let mut mem = VecBufferMemory::new(MEM_BASE, MEM_SIZE);

    for _ in 0..MAX_OPS {
        let Ok(op) = u.arbitrary::<Op>() else {
            break;
        };
        match op {
            Op::Register { offset, len } => {
                let before = fuzzer.registry().len();
                let accepted = fuzzer.register(MEM_BASE + usize::from(offset), len as usize);
                assert_eq!(fuzzer.registry().len(), before + usize::from(accepted));
                assert!(fuzzer.registry().len() <= profile.registry_capacity);
                if accepted {
                    assert!(len as usize <= profile.max_buffer_len);
                }
            }
            Op::Poke { offset, value } => {
                let addr = MEM_BASE + usize::from(offset) % MEM_SIZE;
                let _ = mem.write(addr, &[value]);
            }
            Op::Tick { selector } => {
                let calls = fuzzer.engine().calls();
                let outcome = fuzzer.tick(u32::from(selector), &mut mem);
                if matches!(outcome, TickOutcome::Filtered) {
                    assert_eq!(fuzzer.engine().calls(), calls);
                    continue;
                }
                assert_eq!(fuzzer.engine().calls(), calls + 1);

                if let TickOutcome::Corrupted { report, .. } = outcome {
                    for pass in &report.buffers {
                        assert!(pass.flips.len() <= profile.flips_per_buffer);
                        for flip in &pass.flips {
                            assert!(flip.bit < profile.flip_bit_limit);
                            assert_eq!(flip.offset % WORD_BYTES, 0);
                            assert!(flip.offset + WORD_BYTES <= pass.length);
                            assert!(flip.offset >= profile.window.base_offset);
                            assert!(
                                flip.offset + WORD_BYTES
                                    <= profile.window.base_offset + profile.window.size
                            );
                            assert_eq!(flip.before ^ flip.after, flip.mask());
                        }
                    }
                }
            }
        }
    }
});
