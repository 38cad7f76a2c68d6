//! Sorted snapshot of the target's memory map

use crate::core::types::{Address, Region};
use tracing::debug;

/// Non-overlapping regions ordered by base address
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<Region>,
}

impl RegionMap {
    /// Builds a map from regions in any order
    ///
    /// Empty regions are dropped, and so is any region overlapping the one
    /// before it.
    pub fn from_regions(mut regions: Vec<Region>) -> Self {
        regions.retain(|r| r.length > 0);
        regions.sort_by_key(|r| r.base);

        let mut kept: Vec<Region> = Vec::with_capacity(regions.len());
        for region in regions {
            if let Some(last) = kept.last() {
                if region.base < last.end() {
                    debug!(base = %region.base, "dropping overlapping region");
                    continue;
                }
            }
            kept.push(region);
        }

        RegionMap { regions: kept }
    }

    /// The region containing `address`
    pub fn find(&self, address: Address) -> Option<&Region> {
        let index = self.regions.partition_point(|r| r.base <= address);
        let region = self.regions.get(index.checked_sub(1)?)?;
        region.contains(address).then_some(region)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Regions a scan should visit
    pub fn scannable(&self, writable_only: bool) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(move |r| r.readable && (!writable_only || r.writable))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total bytes across readable regions
    pub fn readable_bytes(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.readable)
            .map(|r| r.length)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: usize, length: usize, readable: bool, writable: bool) -> Region {
        Region::new(Address::new(base), length, readable, writable)
    }

    #[test]
    fn test_find() {
        let map = RegionMap::from_regions(vec![
            region(0x3000, 0x1000, true, false),
            region(0x1000, 0x1000, true, true),
        ]);

        assert_eq!(map.find(Address::new(0x1000)).unwrap().base, Address::new(0x1000));
        assert_eq!(map.find(Address::new(0x1FFF)).unwrap().base, Address::new(0x1000));
        assert!(map.find(Address::new(0x2000)).is_none());
        assert_eq!(map.find(Address::new(0x3500)).unwrap().base, Address::new(0x3000));
        assert!(map.find(Address::new(0x0FFF)).is_none());
        assert!(map.find(Address::new(0x4000)).is_none());
    }

    #[test]
    fn test_overlaps_and_empty_regions_are_dropped() {
        let map = RegionMap::from_regions(vec![
            region(0x1000, 0x2000, true, true),
            region(0x2000, 0x1000, true, true),
            region(0x5000, 0, true, true),
            region(0x3000, 0x100, true, true),
        ]);
        let bases: Vec<_> = map.iter().map(|r| r.base.as_usize()).collect();
        assert_eq!(bases, vec![0x1000, 0x3000]);
    }

    #[test]
    fn test_scannable_filter() {
        let map = RegionMap::from_regions(vec![
            region(0x1000, 0x100, true, true),
            region(0x2000, 0x100, true, false),
            region(0x3000, 0x100, false, false),
        ]);
        assert_eq!(map.scannable(false).count(), 2);
        assert_eq!(map.scannable(true).count(), 1);
        assert_eq!(map.readable_bytes(), 0x200);
    }
}
