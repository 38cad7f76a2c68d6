use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memory_inspector::memory::{neighbors, MemoryWriter};
use memory_inspector::process::{OpenedProcess, SimulatedProcess, TargetHandle};
use memory_inspector::{Address, ProcessInfo, ValueSize};
use std::sync::Arc;

const BASE: usize = 0x1000_0000;

fn target() -> TargetHandle {
    let process = Arc::new(SimulatedProcess::new());
    process.map(BASE, 1 << 20, true, true);
    TargetHandle::new(OpenedProcess {
        info: ProcessInfo::new(1, "bench"),
        memory: Box::new(process),
    })
    .unwrap()
}

fn benchmark_read_write(c: &mut Criterion) {
    let target = target();
    let address = Address::new(BASE + 0x100);

    c.bench_function("read_value_u32", |b| {
        b.iter(|| black_box(target.read_value(address, ValueSize::U32).unwrap()));
    });

    let writer = MemoryWriter::new(&target);
    c.bench_function("validated_write_u32", |b| {
        b.iter(|| writer.write(address, ValueSize::U32, black_box(42)).unwrap());
    });
}

fn benchmark_neighbors(c: &mut Criterion) {
    let target = target();
    c.bench_function("neighbors_radius_25", |b| {
        b.iter(|| black_box(neighbors(&target, Address::new(BASE + 0x8000), ValueSize::U32, 25)));
    });
}

criterion_group!(benches, benchmark_read_write, benchmark_neighbors);
criterion_main!(benches);
