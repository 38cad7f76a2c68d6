//! Shared fixtures for the integration tests

#![allow(dead_code)]

use memory_inspector::config::Config;
use memory_inspector::process::{SimulatedProcess, SimulatedSystem};
use memory_inspector::{Engine, ValueSize};
use std::sync::Arc;
use std::time::Duration;

pub const GAME_PID: u32 = 4242;
pub const HEAP: usize = 0x10_0000;
pub const HEAP_LEN: usize = 0x4000;
pub const RODATA: usize = 0x20_0000;
pub const WAIT: Duration = Duration::from_secs(2);

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.scanner.max_threads = 2;
    config.scanner.chunk_size = 4096;
    config.watch.poll_interval_ms = 5;
    config
}

/// A system with one game process: a writable heap and a read-only page
pub fn game() -> (Arc<SimulatedSystem>, Arc<SimulatedProcess>) {
    let system = Arc::new(SimulatedSystem::new());
    let process = system.spawn(GAME_PID, "game.exe");
    process.map(HEAP, HEAP_LEN, true, true);
    process.map(RODATA, 0x1000, true, false);
    (system, process)
}

pub async fn attached_engine() -> (Arc<SimulatedSystem>, Arc<SimulatedProcess>, Engine) {
    let (system, process) = game();
    let mut engine = Engine::new(test_config(), system.clone()).unwrap();
    engine.select_process(GAME_PID).await.unwrap();
    (system, process, engine)
}

pub fn plant(process: &SimulatedProcess, offsets: &[usize], size: ValueSize, value: u32) {
    for offset in offsets {
        assert!(process.poke_value(*offset, size, value));
    }
}
