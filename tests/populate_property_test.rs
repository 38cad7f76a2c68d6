//! Every populate hit reads back the searched value, and no planted value is missed

mod common;

use common::*;
use memory_inspector::core::types::ProcessInfo;
use memory_inspector::memory::MemoryScanner;
use memory_inspector::process::{OpenedProcess, SimulatedProcess, TargetHandle};
use memory_inspector::ValueSize;
use proptest::prelude::*;
use std::sync::Arc;

const BASE: usize = 0x4000_0000;
const LEN: usize = 0x800;

fn size_strategy() -> impl Strategy<Value = ValueSize> {
    prop_oneof![
        Just(ValueSize::U8),
        Just(ValueSize::U16),
        Just(ValueSize::U32)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn populate_hits_read_back(
        noise in proptest::collection::vec(any::<u8>(), LEN),
        planted in proptest::collection::vec(0usize..LEN - 4, 0..8),
        value in any::<u32>(),
        size in size_strategy(),
        chunk_size in prop_oneof![Just(16usize), Just(64), Just(4096)],
    ) {
        let value = value & size.max_value();
        let process = Arc::new(SimulatedProcess::new());
        process.map(BASE, LEN, true, true);
        process.poke(BASE, &noise);
        for offset in &planted {
            process.poke_value(BASE + offset, size, value);
        }

        let target = TargetHandle::new(OpenedProcess {
            info: ProcessInfo::new(1, "prop"),
            memory: Box::new(Arc::clone(&process)),
        })
        .unwrap();
        let mut config = test_config().scanner;
        config.chunk_size = chunk_size;
        let scanner = MemoryScanner::new(&config).unwrap();

        let session = scanner.populate(&target, value, size, 1).unwrap();
        let hits: Vec<usize> = session.candidates().iter().map(|c| c.address.as_usize()).collect();

        for hit in &hits {
            prop_assert_eq!(process.peek_value(*hit, size), Some(value));
        }
        prop_assert!(hits.windows(2).all(|w| w[0] < w[1]));

        // Later plants can overwrite earlier ones, so only check the ones still intact.
        for offset in &planted {
            if process.peek_value(BASE + offset, size) == Some(value) {
                prop_assert!(hits.contains(&(BASE + offset)));
            }
        }
    }
}
