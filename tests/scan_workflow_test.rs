//! Attach, populate, narrow and reset against a simulated process

mod common;

use common::*;
use memory_inspector::{Address, MemoryChunk, ValueSize};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn offsets(chunks: &[MemoryChunk]) -> Vec<usize> {
    chunks.iter().map(|c| c.offset.as_usize()).collect()
}

#[tokio::test]
async fn test_end_to_end_narrowing() {
    let (_system, process, mut engine) = attached_engine().await;
    let planted = [HEAP + 0x10, HEAP + 0x200, HEAP + 0x3000];
    plant(&process, &planted, ValueSize::U32, 100);

    let found = engine.populate_with_value(100, Some(4)).unwrap();
    assert_eq!(offsets(&found), planted.to_vec());
    assert!(found.iter().all(|c| c.value == 100 && c.size == ValueSize::U32));

    process.poke_value(planted[1], ValueSize::U32, 101);
    let next = engine.scan_next(100).unwrap();
    assert_eq!(offsets(&next), vec![planted[0], planted[2]]);

    let changed = engine.expect_change(true).unwrap();
    assert!(changed.is_empty());

    let unchanged = engine.expect_change(false).unwrap();
    assert_eq!(offsets(&unchanged), vec![planted[0], planted[2]]);
}

#[tokio::test]
async fn test_scan_next_never_reintroduces_addresses() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP, HEAP + 0x40], ValueSize::U16, 7);

    let first: BTreeSet<usize> = offsets(&engine.populate_with_value(7, Some(2)).unwrap())
        .into_iter()
        .collect();

    // A fresh occurrence appears after the initial scan.
    plant(&process, &[HEAP + 0x80], ValueSize::U16, 7);
    process.poke_value(HEAP, ValueSize::U16, 8);

    let second: BTreeSet<usize> = offsets(&engine.scan_next(7).unwrap()).into_iter().collect();
    assert!(second.is_subset(&first));
    assert_eq!(second, [HEAP + 0x40].into_iter().collect());
}

#[tokio::test]
async fn test_empty_scan_next_replaces_session() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP], ValueSize::U32, 55);
    engine.populate_with_value(55, None).unwrap();

    assert!(engine.scan_next(56).unwrap().is_empty());
    assert_eq!(engine.session().unwrap().len(), 0);
    assert!(engine.scan_next(55).unwrap().is_empty());
}

#[tokio::test]
async fn test_expect_change_tracks_last_observed() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP, HEAP + 8], ValueSize::U32, 10);
    engine.populate_with_value(10, None).unwrap();

    process.poke_value(HEAP, ValueSize::U32, 11);
    let changed = engine.expect_change(true).unwrap();
    assert_eq!(
        changed,
        vec![MemoryChunk::new(Address::new(HEAP), ValueSize::U32, 11)]
    );

    // 11 is now the last observation, so it no longer counts as changed.
    assert_eq!(offsets(&engine.expect_change(false).unwrap()), vec![HEAP]);
}

#[tokio::test]
async fn test_scan_value_range_checked_against_size() {
    let (_system, _process, mut engine) = attached_engine().await;
    assert_eq!(
        engine.populate_with_value(256, Some(1)).unwrap_err().code(),
        "BadRange"
    );
    assert_eq!(
        engine.populate_with_value(1, Some(3)).unwrap_err().code(),
        "BadSize"
    );
    assert!(engine.session().is_none());

    engine.populate_with_value(1, Some(1)).unwrap();
    assert_eq!(engine.scan_next(300).unwrap_err().code(), "BadRange");
}

#[tokio::test]
async fn test_populate_uses_settings_size() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP + 0x21], ValueSize::U16, 0xABCD);
    engine.change_settings(2).unwrap();

    let found = engine.populate_with_value(0xABCD, None).unwrap();
    assert_eq!(offsets(&found), vec![HEAP + 0x21]);
    assert_eq!(found[0].size, ValueSize::U16);
}

#[tokio::test]
async fn test_populate_includes_read_only_regions() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP + 4, RODATA + 4], ValueSize::U32, 0x5151);

    let found = engine.populate_with_value(0x5151, Some(4)).unwrap();
    assert_eq!(offsets(&found), vec![HEAP + 4, RODATA + 4]);
}

#[tokio::test]
async fn test_populate_sees_regions_mapped_after_attach() {
    let (_system, process, mut engine) = attached_engine().await;
    process.map(0x30_0000, 0x100, true, true);
    plant(&process, &[0x30_0010], ValueSize::U32, 0x7777);

    let found = engine.populate_with_value(0x7777, Some(4)).unwrap();
    assert_eq!(offsets(&found), vec![0x30_0010]);
}

#[tokio::test]
async fn test_reset_clears_session_only() {
    let (_system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP], ValueSize::U32, 3);
    engine.populate_with_value(3, None).unwrap();

    engine.reset();
    assert_eq!(engine.scan_next(3).unwrap_err().code(), "NoActiveSession");
    assert_eq!(engine.expect_change(true).unwrap_err().code(), "NoActiveSession");
    assert_eq!(engine.current_process().unwrap().pid, GAME_PID);
    assert_eq!(process.peek_value(HEAP, ValueSize::U32), Some(3));
}

#[tokio::test]
async fn test_reattach_invalidates_session() {
    let (system, process, mut engine) = attached_engine().await;
    let other = system.spawn(5000, "other.exe");
    other.map(HEAP, 0x100, true, true);
    plant(&process, &[HEAP], ValueSize::U32, 9);
    plant(&other, &[HEAP], ValueSize::U32, 9);

    engine.populate_with_value(9, None).unwrap();
    engine.select_process(5000).await.unwrap();

    assert!(engine.session().is_none());
    assert_eq!(engine.scan_next(9).unwrap_err().code(), "NoActiveSession");
    assert_eq!(engine.current_process().unwrap().name, "other.exe");
}

#[tokio::test]
async fn test_process_exit_closes_handle() {
    let (system, process, mut engine) = attached_engine().await;
    plant(&process, &[HEAP], ValueSize::U32, 9);
    engine.populate_with_value(9, None).unwrap();

    system.kill(GAME_PID);
    assert!(engine.current_process().is_none());
    assert_eq!(engine.scan_next(9).unwrap_err().code(), "NotAttached");
    assert_eq!(
        engine.populate_with_value(9, None).unwrap_err().code(),
        "NotAttached"
    );
}

#[tokio::test]
async fn test_select_unknown_process() {
    let (system, _process) = game();
    let mut engine = memory_inspector::Engine::new(test_config(), system).unwrap();
    assert_eq!(engine.select_process(1).await.unwrap_err().code(), "NotFound");
    assert_eq!(
        engine.refresh_regions().unwrap_err().code(),
        "NotAttached"
    );
}
