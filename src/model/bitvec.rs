//! Experiment bit vectors.
//!
//! Experiments are indexed by their position in ascending id order, so two
//! runs over the same experiment set produce comparable vectors. Bits are
//! packed most-significant first: position `i` lives in byte `i / 8` under
//! mask `0x80 >> (i % 8)`.

use std::collections::HashMap;

use crate::model::ids::ExperimentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentOrdering {
    ids: Vec<ExperimentId>,
    positions: HashMap<ExperimentId, usize>,
}

impl ExperimentOrdering {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ExperimentId>,
    {
        let mut ids: Vec<ExperimentId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let positions = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { ids, positions }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ExperimentId] {
        &self.ids
    }

    pub fn position(&self, id: ExperimentId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn empty_bits(&self) -> ExperimentBits {
        ExperimentBits::new(self.ids.len())
    }

    /// Ids outside the ordering are ignored; the return value counts the bits set.
    pub fn encode<I>(&self, ids: I) -> (ExperimentBits, usize)
    where
        I: IntoIterator<Item = ExperimentId>,
    {
        let mut bits = self.empty_bits();
        let mut set = 0usize;
        for id in ids {
            if let Some(pos) = self.position(id) {
                if !bits.get(pos) {
                    bits.set(pos);
                    set += 1;
                }
            }
        }
        (bits, set)
    }

    pub fn decode(&self, bits: &ExperimentBits) -> Vec<ExperimentId> {
        self.ids
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < bits.len() && bits.get(*i))
            .map(|(_, id)| *id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExperimentBits {
    bytes: Vec<u8>,
    len: usize,
}

impl ExperimentBits {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn mask(i: usize) -> u8 {
        0x80u8 >> (i % 8)
    }

    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "bit index {i} out of range {}", self.len);
        self.bytes[i / 8] |= Self::mask(i);
    }

    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of range {}", self.len);
        self.bytes[i / 8] & Self::mask(i) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// `1`/`0` per experiment position, padding bits omitted.
    pub fn to_bit_string(&self) -> String {
        (0..self.len)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// True when every bit set here is also set in `other`.
    pub fn is_subset_of(&self, other: &ExperimentBits) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter().chain(std::iter::repeat(&0u8)))
            .all(|(a, b)| a & !b == 0)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/bitvec.rs"]
mod tests;
