//! Sampled suffix array for recovering text coordinates from index rows.

use crate::fm_index::{FmSearch, SaInterval};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A coordinate in the indexed corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPosition {
    pub seq_id: u32,
    pub offset: usize,
}

pub trait PositionRecovery: Sync {
    /// Translate a suffix-array row into `(sequence id, offset)`.
    fn recover_position<I: FmSearch>(&self, index: &I, row: usize) -> TextPosition;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampledSuffixArray {
    sample_rate: usize,
    /// row -> absolute text position, for rows whose position is a multiple
    /// of the rate or the start of a sequence
    samples: FxHashMap<u32, u32>,
    /// absolute start of every sequence in the concatenated text
    seq_starts: Vec<usize>,
}

impl SampledSuffixArray {
    pub fn build(suffix_array: &[u32], sequence_lengths: &[usize], sample_rate: usize) -> Self {
        let sample_rate = sample_rate.max(1);

        let mut seq_starts = Vec::with_capacity(sequence_lengths.len());
        let mut start = 0;
        for &len in sequence_lengths {
            seq_starts.push(start);
            start += len + 1;
        }

        // Sequence starts are always sampled: LF through a separator row is
        // only well defined for the first sequence, so walks must stop there.
        let samples = suffix_array
            .iter()
            .enumerate()
            .filter(|(_, &pos)| {
                let pos = pos as usize;
                pos % sample_rate == 0 || seq_starts.binary_search(&pos).is_ok()
            })
            .map(|(row, &pos)| (row as u32, pos))
            .collect();

        SampledSuffixArray {
            sample_rate,
            samples,
            seq_starts,
        }
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    pub fn num_sequences(&self) -> usize {
        self.seq_starts.len()
    }

    /// Absolute text position of `row`, found by LF-walking to the nearest sample.
    pub fn absolute_position<I: FmSearch>(&self, index: &I, row: usize) -> usize {
        let mut current = row;
        let mut steps = 0;
        loop {
            if let Some(&pos) = self.samples.get(&(current as u32)) {
                return pos as usize + steps;
            }
            current = index.lf(current).0;
            steps += 1;
        }
    }

    fn split_position(&self, absolute: usize) -> TextPosition {
        let seq_id = match self.seq_starts.binary_search(&absolute) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        TextPosition {
            seq_id: seq_id as u32,
            offset: absolute - self.seq_starts.get(seq_id).copied().unwrap_or(0),
        }
    }
}

impl PositionRecovery for SampledSuffixArray {
    fn recover_position<I: FmSearch>(&self, index: &I, row: usize) -> TextPosition {
        self.split_position(self.absolute_position(index, row))
    }
}

/// Every position where `pattern` occurs, sorted.
pub fn locate<I: FmSearch, P: PositionRecovery>(index: &I, ssa: &P, pattern: &[u8]) -> Vec<TextPosition> {
    match index.backward_search(pattern) {
        Some(interval) => locate_interval(index, ssa, interval),
        None => Vec::new(),
    }
}

pub fn locate_interval<I: FmSearch, P: PositionRecovery>(
    index: &I,
    ssa: &P,
    interval: SaInterval,
) -> Vec<TextPosition> {
    let mut positions: Vec<TextPosition> = (interval.lower..interval.upper)
        .map(|row| ssa.recover_position(index, row))
        .collect();
    positions.sort_unstable();
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::FmIndex;

    #[test]
    fn test_recovery_matches_full_suffix_array() {
        let seqs: Vec<&[u8]> = vec![b"ACGTTGCAACGT", b"TTGCA", b"GATTACAGATTACA"];
        let lengths: Vec<usize> = seqs.iter().map(|s| s.len()).collect();
        let (index, sa) = FmIndex::build(&seqs).unwrap();

        for rate in [1, 3, 8] {
            let ssa = SampledSuffixArray::build(&sa, &lengths, rate);
            for (row, &pos) in sa.iter().enumerate() {
                assert_eq!(ssa.absolute_position(&index, row), pos as usize, "rate {rate}");
            }
        }
    }

    #[test]
    fn test_recovery_across_sequence_starts() {
        // the first sequence does not sort first among the sequence starts
        let seqs: Vec<&[u8]> = vec![b"TTTGCA", b"AAACG", b"CCATG", b"GGTAC"];
        let lengths: Vec<usize> = seqs.iter().map(|s| s.len()).collect();
        let (index, sa) = FmIndex::build(&seqs).unwrap();

        for rate in [2, 5, 64] {
            let ssa = SampledSuffixArray::build(&sa, &lengths, rate);
            for (row, &pos) in sa.iter().enumerate() {
                assert_eq!(ssa.absolute_position(&index, row), pos as usize, "rate {rate}");
            }
        }
        let ssa = SampledSuffixArray::build(&sa, &lengths, 64);
        assert_eq!(locate(&index, &ssa, b"CG"), vec![TextPosition { seq_id: 1, offset: 3 }]);
    }

    #[test]
    fn test_locate_reports_sequence_coordinates() {
        let seqs: Vec<&[u8]> = vec![b"AAAAGATTACA", b"CCGATTACACC"];
        let lengths: Vec<usize> = seqs.iter().map(|s| s.len()).collect();
        let (index, sa) = FmIndex::build(&seqs).unwrap();
        let ssa = SampledSuffixArray::build(&sa, &lengths, 4);

        let hits = locate(&index, &ssa, b"GATTACA");
        assert_eq!(
            hits,
            vec![
                TextPosition { seq_id: 0, offset: 4 },
                TextPosition { seq_id: 1, offset: 2 },
            ]
        );
        assert!(locate(&index, &ssa, b"GGGG").is_empty());
    }
}
