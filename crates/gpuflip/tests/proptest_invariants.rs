use gpuflip::{
    flip_random_bits, BufferRegistry, FixedSeed, FlipWindow, Fuzzer, Profile, TickOutcome,
    VecBufferMemory, MAX_BUFFER_LEN, REGISTRY_CAPACITY, SUBMIT_COMMAND_BUFFER_SELECTORS,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

prop_compose! {
    fn arb_candidate()(
        start in prop_oneof![Just(0usize), 1usize..usize::MAX],
        length in prop_oneof![Just(0usize), 1usize..=MAX_BUFFER_LEN, MAX_BUFFER_LEN..usize::MAX],
    ) -> (usize, usize) {
        (start, length)
    }
}

proptest! {
    #[test]
    fn registry_admits_only_plausible_buffers(
        candidates in proptest::collection::vec(arb_candidate(), 0..64),
    ) {
        let mut registry = BufferRegistry::new(MAX_BUFFER_LEN);
        let mut expected = Vec::new();
        for &(start, length) in &candidates {
            let plausible = start != 0 && length != 0 && length <= MAX_BUFFER_LEN;
            let admitted = registry.register(start, length);
            prop_assert_eq!(admitted, plausible && expected.len() < REGISTRY_CAPACITY);
            if admitted {
                expected.push((start, length));
            }
        }

        prop_assert!(registry.len() <= REGISTRY_CAPACITY);
        let tracked: Vec<(usize, usize)> =
            registry.iter().map(|desc| (desc.start(), desc.length())).collect();
        prop_assert_eq!(tracked, expected);
    }

    #[test]
    fn flips_touch_one_low_bit_of_an_aligned_word_in_the_window(
        seed in any::<u64>(),
        length in 1usize..0x3000,
        base_offset in 0usize..0x100,
        size in 0usize..0x2000,
    ) {
        const BASE: usize = 0x10_0000;
        let mut mem = VecBufferMemory::new(BASE, length);
        let mut registry = BufferRegistry::new(MAX_BUFFER_LEN);
        registry.register(BASE, length);
        let desc = registry.get(0).unwrap();
        let window = FlipWindow { base_offset, size };

        let mut rng = StdRng::seed_from_u64(seed);
        let flips = flip_random_bits(&mut mem, desc, window, 24, 32, &mut rng).unwrap();

        let end = (base_offset + size).min(length);
        for flip in &flips {
            prop_assert_eq!(flip.offset % 4, 0);
            prop_assert!(flip.offset >= base_offset);
            prop_assert!(flip.offset + 4 <= end);
            let diff = flip.before ^ flip.after;
            prop_assert!(diff.is_power_of_two());
            prop_assert!(diff <= 1 << 23);
        }
        prop_assert_eq!(flips.is_empty(), window.word_range(length).is_none());
    }

    #[test]
    fn persistent_cadence_fires_on_multiples_of_four_after_warm_up(
        selectors in proptest::collection::vec(any::<u32>(), 1..200),
    ) {
        let mut fuzzer = Fuzzer::new(Profile::PERSISTENT_CYCLIC, FixedSeed(0));
        let mut mem = VecBufferMemory::new(0x1000, 0x40);
        fuzzer.register(0x1000, 0x40);

        for (i, &selector) in selectors.iter().enumerate() {
            let call = i as u64 + 1;
            let fired = fuzzer.tick(selector, &mut mem).fired();
            prop_assert_eq!(fired, call >= 10 && call % 4 == 0, "call {}", call);
        }
    }

    #[test]
    fn burst_cadence_fires_only_for_counted_calls_ten_to_fourteen(
        selectors in proptest::collection::vec(
            prop_oneof![
                proptest::sample::select(SUBMIT_COMMAND_BUFFER_SELECTORS),
                any::<u32>(),
            ],
            1..200,
        ),
    ) {
        let mut fuzzer = Fuzzer::new(Profile::SINGLE_BURST, FixedSeed(0));
        let mut mem = VecBufferMemory::new(0x1000, 0x40);
        fuzzer.register(0x1000, 0x40);

        let mut counted = 0u64;
        for &selector in &selectors {
            let outcome = fuzzer.tick(selector, &mut mem);
            if SUBMIT_COMMAND_BUFFER_SELECTORS.contains(&selector) {
                counted += 1;
                prop_assert_eq!(outcome.fired(), (10..=14).contains(&counted));
            } else {
                prop_assert_eq!(outcome, TickOutcome::Filtered);
            }
        }
        prop_assert_eq!(fuzzer.engine().calls(), counted);
    }
}
