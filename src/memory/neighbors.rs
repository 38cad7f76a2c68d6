//! Windowed view of the values around an address

use crate::core::types::{Address, MemoryChunk, ValueSize};
use crate::memory::reader;
use crate::process::TargetHandle;

/// Reads up to `radius` values on each side of `center`, plus `center` itself
///
/// Entries are `size` bytes apart and never leave the region holding
/// `center`. Entries that can't be read are left out, and an address outside
/// every known region yields an empty window.
pub fn neighbors(
    target: &TargetHandle,
    center: Address,
    size: ValueSize,
    radius: usize,
) -> Vec<MemoryChunk> {
    let regions = target.regions();
    let Some(region) = regions.find(center).filter(|r| r.readable) else {
        return Vec::new();
    };

    let step = size.bytes();
    let width = size.bytes();
    let below = (1..=radius)
        .rev()
        .filter_map(|i| center.checked_sub(i.checked_mul(step)?));
    let above = (1..=radius).filter_map(|i| center.checked_add(i.checked_mul(step)?));
    let addresses: Vec<Address> = below
        .chain(std::iter::once(center))
        .chain(above)
        .filter(|address| region.contains_span(*address, width))
        .collect();

    let span_limit = addresses.len().saturating_mul(step);
    let values = reader::read_values(target, &regions, &addresses, size, span_limit);

    addresses
        .into_iter()
        .zip(values)
        .filter_map(|(address, value)| Some(MemoryChunk::new(address, size, value?)))
        .collect()
}
