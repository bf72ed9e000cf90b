//! FM-index over a `$`-separated sequence corpus.
//!
//! The BWT is stored one rank per byte. Occurrence counts are checkpointed
//! every 64 symbols and the remainder is counted by a short scan.

use crate::dna::{base_rank, ALPHABET_SIZE, SENTINEL_RANK};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;

const CP_SHIFT: usize = 6;
const CP_INTERVAL: usize = 1 << CP_SHIFT;

/// Longest corpus (separators included) whose rows and positions fit in `u32`.
pub const MAX_TEXT_LEN: usize = u32::MAX as usize;

/// Half-open range `[lower, upper)` of suffix-array rows sharing a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaInterval {
    pub lower: usize,
    pub upper: usize,
}

impl SaInterval {
    pub fn size(&self) -> usize {
        self.upper - self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.upper <= self.lower
    }
}

/// Exact-match capability of a compressed full-text index.
pub trait FmSearch: Sync {
    /// Number of rows in the suffix array (text length including separators).
    fn text_len(&self) -> usize;

    /// Interval of rows whose suffix starts with the single base `base`.
    fn base_interval(&self, base: u8) -> Option<SaInterval>;

    /// Prepend `base` to the pattern represented by `interval`.
    fn extend_left(&self, interval: SaInterval, base: u8) -> Option<SaInterval>;

    /// Last-to-first mapping of row `row`, with the rank of the BWT symbol there.
    fn lf(&self, row: usize) -> (usize, u8);

    /// Interval of rows prefixed by `pattern`, `None` when it does not occur.
    fn backward_search(&self, pattern: &[u8]) -> Option<SaInterval> {
        let (&last, rest) = pattern.split_last()?;
        let mut interval = self.base_interval(last)?;
        for &base in rest.iter().rev() {
            interval = self.extend_left(interval, base)?;
        }
        Some(interval)
    }

    fn count(&self, pattern: &[u8]) -> usize {
        self.backward_search(pattern).map_or(0, |i| i.size())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FmIndex {
    bwt: Vec<u8>,
    /// `cumulative[c]` = number of symbols with rank < c
    cumulative: [usize; ALPHABET_SIZE + 1],
    checkpoints: Vec<[u32; ALPHABET_SIZE]>,
}

impl FmIndex {
    /// Build the index over `sequences`, returning it with the full suffix
    /// array so callers can sample positions from it.
    pub fn build<S: AsRef<[u8]> + Sync>(sequences: &[S]) -> io::Result<(Self, Vec<u32>)> {
        check_text_len(text_len(sequences))?;
        let text = concatenate(sequences);
        let mut suffix_array: Vec<u32> = (0..text.len() as u32).collect();
        suffix_array.par_sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));

        let bwt: Vec<u8> = suffix_array
            .iter()
            .map(|&pos| {
                if pos == 0 {
                    text[text.len() - 1]
                } else {
                    text[pos as usize - 1]
                }
            })
            .collect();

        Ok((Self::from_bwt(bwt), suffix_array))
    }

    fn from_bwt(bwt: Vec<u8>) -> Self {
        let mut counts = [0u32; ALPHABET_SIZE];
        let mut checkpoints = Vec::with_capacity(bwt.len() / CP_INTERVAL + 1);
        for (i, &symbol) in bwt.iter().enumerate() {
            if i % CP_INTERVAL == 0 {
                checkpoints.push(counts);
            }
            counts[symbol as usize] += 1;
        }
        if bwt.len() % CP_INTERVAL == 0 {
            checkpoints.push(counts);
        }

        let mut cumulative = [0usize; ALPHABET_SIZE + 1];
        for c in 0..ALPHABET_SIZE {
            cumulative[c + 1] = cumulative[c] + counts[c] as usize;
        }

        FmIndex {
            bwt,
            cumulative,
            checkpoints,
        }
    }

    /// Occurrences of symbol rank `c` in `bwt[0..row]`.
    #[inline]
    pub fn occ(&self, c: u8, row: usize) -> usize {
        let block = row >> CP_SHIFT;
        let base = self.checkpoints[block][c as usize] as usize;
        let start = block << CP_SHIFT;
        base + self.bwt[start..row].iter().filter(|&&s| s == c).count()
    }

    pub fn symbol_count(&self, c: u8) -> usize {
        self.cumulative[c as usize + 1] - self.cumulative[c as usize]
    }
}

impl FmSearch for FmIndex {
    fn text_len(&self) -> usize {
        self.bwt.len()
    }

    fn base_interval(&self, base: u8) -> Option<SaInterval> {
        let c = base_rank(base) as usize;
        let interval = SaInterval {
            lower: self.cumulative[c],
            upper: self.cumulative[c + 1],
        };
        (!interval.is_empty()).then_some(interval)
    }

    fn extend_left(&self, interval: SaInterval, base: u8) -> Option<SaInterval> {
        let c = base_rank(base);
        let offset = self.cumulative[c as usize];
        let extended = SaInterval {
            lower: offset + self.occ(c, interval.lower),
            upper: offset + self.occ(c, interval.upper),
        };
        (!extended.is_empty()).then_some(extended)
    }

    fn lf(&self, row: usize) -> (usize, u8) {
        let c = self.bwt[row];
        (self.cumulative[c as usize] + self.occ(c, row), c)
    }
}

fn text_len<S: AsRef<[u8]>>(sequences: &[S]) -> usize {
    sequences
        .iter()
        .map(|s| s.as_ref().len() + 1)
        .sum::<usize>()
        .max(1)
}

fn check_text_len(len: usize) -> io::Result<()> {
    if len > MAX_TEXT_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Corpus of {len} symbols exceeds the index limit of {MAX_TEXT_LEN}"),
        ));
    }
    Ok(())
}

/// Concatenate sequences as ranks, terminating each with the separator.
fn concatenate<S: AsRef<[u8]>>(sequences: &[S]) -> Vec<u8> {
    let mut text = Vec::with_capacity(text_len(sequences));
    for seq in sequences {
        text.extend(seq.as_ref().iter().map(|&b| base_rank(b)));
        text.push(SENTINEL_RANK);
    }
    if text.is_empty() {
        text.push(SENTINEL_RANK);
    }
    text
}
