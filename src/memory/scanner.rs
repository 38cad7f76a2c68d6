//! Initial value scan and candidate narrowing

use crate::config::ScannerConfig;
use crate::core::types::{
    Address, Candidate, MemoryChunk, MemoryError, MemoryResult, Region, ScanSession, ValueSize,
};
use crate::memory::{reader, RegionMap};
use std::sync::Arc;
use crate::process::TargetHandle;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::io;
use std::time::Instant;
use tracing::{debug, info};

/// One chunk of one region
#[derive(Debug, Clone, Copy)]
struct ScanJob<'r> {
    region: &'r Region,
    offset: usize,
}

/// Parallel scanner over the attached process
///
/// Owns a dedicated rayon pool so scans never compete with the global pool.
pub struct MemoryScanner {
    pool: ThreadPool,
    chunk_size: usize,
    writable_only: bool,
    refresh_before_scan: bool,
}

impl MemoryScanner {
    /// Create a new memory scanner
    pub fn new(config: &ScannerConfig) -> MemoryResult<Self> {
        let threads = if config.max_threads == 0 {
            num_cpus::get()
        } else {
            config.max_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("scan-worker-{}", i))
            .build()
            .map_err(|e| MemoryError::IoError(io::Error::new(io::ErrorKind::Other, e)))?;

        Ok(MemoryScanner {
            pool,
            chunk_size: config.chunk_size.max(1),
            writable_only: config.writable_only,
            refresh_before_scan: config.refresh_regions_before_scan,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Finds every address holding `value` at width `size`
    ///
    /// Every byte offset of every scanned region is checked. Chunks that
    /// can't be read are skipped.
    pub fn populate(
        &self,
        target: &TargetHandle,
        value: u32,
        size: ValueSize,
        generation: u64,
    ) -> MemoryResult<ScanSession> {
        let started = Instant::now();
        let regions = self.scan_regions(target)?;

        let encoded = size.encode(value);
        let needle = &encoded[..size.bytes()];
        let jobs = self.jobs(&regions);

        let window = self.chunk_size + needle.len() - 1;
        let hits: Vec<Vec<Address>> = self.pool.install(|| {
            jobs.par_iter()
                .map_init(
                    || vec![0u8; window],
                    |buffer, job| self.scan_chunk(target, job, needle, buffer),
                )
                .collect()
        });

        let total = hits.iter().map(Vec::len).sum();
        let mut candidates = Vec::with_capacity(total);
        for chunk in hits {
            candidates.extend(chunk.into_iter().map(|a| Candidate::new(a, value)));
        }

        info!(
            value,
            size = size.bytes(),
            chunks = jobs.len(),
            candidates = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "populate finished"
        );
        Ok(ScanSession::new(candidates, size, generation))
    }

    /// Reads every `size`-wide value of every scanned region
    ///
    /// Values are aligned to their region's base and returned in address
    /// order. Chunks that can't be read are skipped.
    pub fn snapshot(
        &self,
        target: &TargetHandle,
        size: ValueSize,
    ) -> MemoryResult<Vec<MemoryChunk>> {
        let started = Instant::now();
        let regions = self.scan_regions(target)?;
        let jobs = self.jobs(&regions);

        let width = size.bytes();
        let window = self.chunk_size + width - 1;
        let parts: Vec<Vec<MemoryChunk>> = self.pool.install(|| {
            jobs.par_iter()
                .map_init(
                    || vec![0u8; window],
                    |buffer, job| self.snapshot_chunk(target, job, size, buffer),
                )
                .collect()
        });
        let values: Vec<MemoryChunk> = parts.into_iter().flatten().collect();

        info!(
            size = width,
            chunks = jobs.len(),
            values = values.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot finished"
        );
        Ok(values)
    }

    fn scan_regions(&self, target: &TargetHandle) -> MemoryResult<Arc<RegionMap>> {
        if self.refresh_before_scan {
            target.refresh_regions()
        } else {
            Ok(target.regions())
        }
    }

    fn jobs<'r>(&self, regions: &'r RegionMap) -> Vec<ScanJob<'r>> {
        regions
            .scannable(self.writable_only)
            .flat_map(|region| {
                (0..region.length)
                    .step_by(self.chunk_size)
                    .map(move |offset| ScanJob { region, offset })
            })
            .collect()
    }

    /// Reads one chunk plus `width - 1` bytes of overlap into `buffer`
    fn read_chunk<'b>(
        &self,
        target: &TargetHandle,
        job: &ScanJob<'_>,
        width: usize,
        buffer: &'b mut [u8],
    ) -> Option<(Address, &'b [u8])> {
        let remaining = job.region.length - job.offset;
        // Overlap the next chunk by width - 1 bytes so straddling values are seen once.
        let len = (self.chunk_size + width - 1).min(remaining);
        if len < width {
            return None;
        }

        let start = Address::new(job.region.base.as_usize() + job.offset);
        let data = &mut buffer[..len];
        if let Err(e) = target.read_bytes(start, data) {
            debug!(address = %start, len, error = %e, "skipping unreadable chunk");
            return None;
        }
        Some((start, &*data))
    }

    fn snapshot_chunk(
        &self,
        target: &TargetHandle,
        job: &ScanJob<'_>,
        size: ValueSize,
        buffer: &mut [u8],
    ) -> Vec<MemoryChunk> {
        let width = size.bytes();
        let Some((start, data)) = self.read_chunk(target, job, width, buffer) else {
            return Vec::new();
        };

        let skip = (width - job.offset % width) % width;
        data.windows(width)
            .enumerate()
            .skip(skip)
            .step_by(width)
            .filter_map(|(i, bytes)| {
                let value = size.decode(bytes)?;
                Some(MemoryChunk::new(Address::new(start.as_usize() + i), size, value))
            })
            .collect()
    }

    fn scan_chunk(
        &self,
        target: &TargetHandle,
        job: &ScanJob<'_>,
        needle: &[u8],
        buffer: &mut [u8],
    ) -> Vec<Address> {
        let width = needle.len();
        let Some((start, data)) = self.read_chunk(target, job, width, buffer) else {
            return Vec::new();
        };

        data.windows(width)
            .enumerate()
            .filter(|(_, window)| *window == needle)
            .map(|(i, _)| Address::new(start.as_usize() + i))
            .collect()
    }

    fn reread(&self, target: &TargetHandle, session: &ScanSession) -> Vec<Option<u32>> {
        let regions = target.regions();
        let addresses: Vec<Address> = session.candidates().iter().map(|c| c.address).collect();
        self.pool.install(|| {
            reader::read_values(
                target,
                &regions,
                &addresses,
                session.value_size(),
                self.chunk_size,
            )
        })
    }

    /// Keeps candidates that currently read as `value`
    pub fn scan_next(
        &self,
        target: &TargetHandle,
        session: &ScanSession,
        value: u32,
        generation: u64,
    ) -> ScanSession {
        let fresh = self.reread(target, session);
        let survivors: Vec<Candidate> = session
            .candidates()
            .iter()
            .zip(fresh)
            .filter_map(|(candidate, current)| match current {
                Some(current) if current == value => {
                    Some(Candidate::new(candidate.address, current))
                }
                _ => None,
            })
            .collect();

        debug!(
            before = session.len(),
            after = survivors.len(),
            value,
            "scan_next narrowed"
        );
        session.successor(survivors, generation)
    }

    /// Keeps candidates whose changed-ness since the last observation matches `is_changed`
    pub fn expect_change(
        &self,
        target: &TargetHandle,
        session: &ScanSession,
        is_changed: bool,
        generation: u64,
    ) -> ScanSession {
        let fresh = self.reread(target, session);
        let survivors: Vec<Candidate> = session
            .candidates()
            .iter()
            .zip(fresh)
            .filter_map(|(candidate, current)| {
                let current = current?;
                ((current != candidate.last_observed) == is_changed)
                    .then(|| Candidate::new(candidate.address, current))
            })
            .collect();

        debug!(
            before = session.len(),
            after = survivors.len(),
            is_changed,
            "expect_change narrowed"
        );
        session.successor(survivors, generation)
    }
}

impl std::fmt::Debug for MemoryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryScanner")
            .field("threads", &self.threads())
            .field("chunk_size", &self.chunk_size)
            .field("writable_only", &self.writable_only)
            .finish()
    }
}
