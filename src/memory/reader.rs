//! Batched re-reads of many candidate addresses
//!
//! Nearby addresses inside one region are fetched with a single read of the
//! span covering them. When a span read fails each address is retried alone,
//! so one bad page costs only the candidates that actually live on it.

use crate::core::types::{Address, ValueSize};
use crate::memory::regions::RegionMap;
use crate::process::TargetHandle;
use rayon::prelude::*;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Batch {
    /// `addresses[indices]` share one readable region and fit in one read
    Span {
        indices: Range<usize>,
        start: Address,
        len: usize,
    },
    /// Outside the known map; read on its own
    Single(usize),
}

fn plan_batches(
    regions: &RegionMap,
    addresses: &[Address],
    size: ValueSize,
    span_limit: usize,
) -> Vec<Batch> {
    let width = size.bytes();
    let span_limit = span_limit.max(width);
    let mut batches = Vec::new();
    let mut first = 0;

    while first < addresses.len() {
        let start = addresses[first];
        let region = regions
            .find(start)
            .filter(|r| r.readable && r.contains_span(start, width));

        let Some(region) = region else {
            batches.push(Batch::Single(first));
            first += 1;
            continue;
        };

        let mut end = first + 1;
        let mut len = width;
        while let Some(&next) = addresses.get(end) {
            let Some(reach) = next.offset_from(start).and_then(|o| o.checked_add(width)) else {
                break;
            };
            if reach > span_limit || !region.contains_span(next, width) {
                break;
            }
            len = reach;
            end += 1;
        }

        batches.push(Batch::Span {
            indices: first..end,
            start,
            len,
        });
        first = end;
    }

    batches
}

fn read_batch(
    target: &TargetHandle,
    addresses: &[Address],
    batch: &Batch,
    size: ValueSize,
) -> Vec<Option<u32>> {
    match batch {
        Batch::Single(index) => vec![target.read_value(addresses[*index], size).ok()],
        Batch::Span {
            indices,
            start,
            len,
        } => {
            let members = &addresses[indices.clone()];
            let mut buffer = vec![0u8; *len];
            match target.read_bytes(*start, &mut buffer) {
                Ok(()) => members
                    .iter()
                    .map(|address| {
                        let offset = address.offset_from(*start)?;
                        size.decode(buffer.get(offset..)?)
                    })
                    .collect(),
                Err(_) => members
                    .iter()
                    .map(|address| target.read_value(*address, size).ok())
                    .collect(),
            }
        }
    }
}

/// Reads a `size`-wide value at each address, in input order
///
/// `addresses` must be ascending. `None` marks an address that could not be
/// read. Batches run on the current rayon pool.
pub fn read_values(
    target: &TargetHandle,
    regions: &RegionMap,
    addresses: &[Address],
    size: ValueSize,
    span_limit: usize,
) -> Vec<Option<u32>> {
    let batches = plan_batches(regions, addresses, size, span_limit);
    let per_batch: Vec<Vec<Option<u32>>> = batches
        .par_iter()
        .map(|batch| read_batch(target, addresses, batch, size))
        .collect();

    let mut values = Vec::with_capacity(addresses.len());
    for chunk in per_batch {
        values.extend(chunk);
    }
    values
}
