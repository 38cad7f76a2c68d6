//! Scan session, candidate and chunk types

use super::{Address, ValueSize};
use serde::{Deserialize, Serialize};

/// An address currently believed to hold a value of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub address: Address,
    pub last_observed: u32,
}

impl Candidate {
    pub fn new(address: Address, last_observed: u32) -> Self {
        Candidate {
            address,
            last_observed,
        }
    }
}

/// Externally visible `{offset, size, value}` projection of a candidate or sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryChunk {
    pub offset: Address,
    pub size: ValueSize,
    pub value: u32,
}

impl MemoryChunk {
    pub fn new(offset: Address, size: ValueSize, value: u32) -> Self {
        MemoryChunk {
            offset,
            size,
            value,
        }
    }
}

/// The current candidate set plus the width used to interpret it
///
/// Candidates are kept in strictly ascending address order. A session is
/// never narrowed in place: every narrowing step builds a successor with a
/// higher generation.
#[derive(Debug, Clone)]
pub struct ScanSession {
    candidates: Vec<Candidate>,
    value_size: ValueSize,
    generation: u64,
}

impl ScanSession {
    /// Creates a session; `candidates` must already be sorted by address
    pub fn new(candidates: Vec<Candidate>, value_size: ValueSize, generation: u64) -> Self {
        debug_assert!(candidates
            .windows(2)
            .all(|pair| pair[0].address < pair[1].address));
        ScanSession {
            candidates,
            value_size,
            generation,
        }
    }

    /// Builds the successor session holding `candidates`
    pub fn successor(&self, candidates: Vec<Candidate>, generation: u64) -> Self {
        ScanSession::new(candidates, self.value_size, generation)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn value_size(&self) -> ValueSize {
        self.value_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Projects the candidates to chunks
    pub fn chunks(&self) -> Vec<MemoryChunk> {
        self.candidates
            .iter()
            .map(|c| MemoryChunk::new(c.address, self.value_size, c.last_observed))
            .collect()
    }
}

/// Engine-wide preferences consumed by scans that don't name a size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub value_size: ValueSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ScanSession {
        ScanSession::new(
            vec![
                Candidate::new(Address::new(0x1000), 100),
                Candidate::new(Address::new(0x2000), 200),
            ],
            ValueSize::U32,
            1,
        )
    }

    #[test]
    fn test_session_projection() {
        let session = session();
        assert_eq!(session.len(), 2);
        assert_eq!(
            session.chunks(),
            vec![
                MemoryChunk::new(Address::new(0x1000), ValueSize::U32, 100),
                MemoryChunk::new(Address::new(0x2000), ValueSize::U32, 200),
            ]
        );
    }

    #[test]
    fn test_successor_keeps_size() {
        let next = session().successor(Vec::new(), 2);
        assert!(next.is_empty());
        assert_eq!(next.value_size(), ValueSize::U32);
        assert_eq!(next.generation(), 2);
    }

    #[test]
    fn test_chunk_wire_shape() {
        let chunk = MemoryChunk::new(Address::new(16), ValueSize::U16, 7);
        let json = serde_json::to_value(chunk).unwrap();
        assert_eq!(json, serde_json::json!({"offset": 16, "size": 2, "value": 7}));
    }

    #[test]
    fn test_settings_default() {
        assert_eq!(Settings::default().value_size, ValueSize::U32);
    }
}
