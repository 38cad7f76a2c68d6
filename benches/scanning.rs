use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memory_inspector::config::Config;
use memory_inspector::memory::MemoryScanner;
use memory_inspector::process::{OpenedProcess, SimulatedProcess, TargetHandle};
use memory_inspector::{ProcessInfo, ValueSize};
use std::sync::Arc;

const BASE: usize = 0x1000_0000;

fn target_with(len: usize) -> (Arc<SimulatedProcess>, TargetHandle) {
    let process = Arc::new(SimulatedProcess::new());
    process.map(BASE, len, true, true);
    for offset in (0..len).step_by(4096) {
        process.poke_value(BASE + offset, ValueSize::U32, 100);
    }
    let target = TargetHandle::new(OpenedProcess {
        info: ProcessInfo::new(1, "bench"),
        memory: Box::new(Arc::clone(&process)),
    })
    .unwrap();
    (process, target)
}

fn benchmark_populate(c: &mut Criterion) {
    let scanner = MemoryScanner::new(&Config::default().scanner).unwrap();
    let mut group = c.benchmark_group("populate");

    for len in [1 << 20, 16 << 20] {
        let (_process, target) = target_with(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(scanner.populate(&target, 100, ValueSize::U32, 1).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_scan_next(c: &mut Criterion) {
    let scanner = MemoryScanner::new(&Config::default().scanner).unwrap();
    let (_process, target) = target_with(16 << 20);
    let session = scanner.populate(&target, 100, ValueSize::U32, 1).unwrap();

    c.bench_function("scan_next_4096_candidates", |b| {
        b.iter(|| black_box(scanner.scan_next(&target, &session, 100, 2)));
    });
}

criterion_group!(benches, benchmark_populate, benchmark_scan_next);
criterion_main!(benches);
