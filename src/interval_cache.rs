use crate::dna::two_bit;
use crate::fm_index::{FmSearch, SaInterval};
use serde::{Deserialize, Serialize};

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// 4^12 entries; longer words are served by extension.
pub const MAX_CACHE_LEN: usize = 12;

/// Precomputed suffix-array intervals for every ACGT word of a fixed length.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalCache {
    cache_len: usize,
    /// indexed by the 2-bit packed word; `None` when the word is absent
    intervals: Vec<Option<SaInterval>>,
}

impl IntervalCache {
    pub fn build<I: FmSearch>(index: &I, cache_len: usize) -> Self {
        let cache_len = cache_len.min(MAX_CACHE_LEN);
        let mut intervals = vec![None; 1usize << (2 * cache_len)];
        if cache_len > 0 {
            // Words are filled right to left so each level extends the previous one
            let mut stack: Vec<(usize, usize, SaInterval)> = BASES
                .iter()
                .enumerate()
                .filter_map(|(code, &b)| index.base_interval(b).map(|iv| (1, code, iv)))
                .collect();
            while let Some((depth, code, interval)) = stack.pop() {
                if depth == cache_len {
                    intervals[code] = Some(interval);
                    continue;
                }
                for (prefix, &b) in BASES.iter().enumerate() {
                    if let Some(extended) = index.extend_left(interval, b) {
                        let packed = (prefix << (2 * depth)) | code;
                        stack.push((depth + 1, packed, extended));
                    }
                }
            }
        }
        IntervalCache {
            cache_len,
            intervals,
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache_len
    }

    fn cached(&self, word: &[u8]) -> Option<Option<SaInterval>> {
        let mut code = 0usize;
        // the last base of the word sits in the lowest bits
        for (i, &base) in word.iter().rev().enumerate() {
            code |= two_bit(base)? << (2 * i);
        }
        Some(self.intervals[code])
    }

    /// Interval of rows prefixed by `kmer`. The last `cache_len` bases come
    /// from the cache and the rest are added by backward extension.
    pub fn interval<I: FmSearch>(&self, index: &I, kmer: &[u8]) -> Option<SaInterval> {
        if self.cache_len == 0 || kmer.len() < self.cache_len {
            return index.backward_search(kmer);
        }
        let split = kmer.len() - self.cache_len;
        let mut interval = match self.cached(&kmer[split..]) {
            Some(hit) => hit?,
            None => return index.backward_search(kmer),
        };
        for &base in kmer[..split].iter().rev() {
            interval = index.extend_left(interval, base)?;
        }
        Some(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::FmIndex;

    #[test]
    fn test_cache_agrees_with_backward_search() {
        let seqs: Vec<&[u8]> = vec![b"ACGTTGCAACGTAGGCTTAGCNACGT", b"TTGCAGGCAT"];
        let (index, _) = FmIndex::build(&seqs).unwrap();
        let cache = IntervalCache::build(&index, 3);

        for kmer in [
            &b"ACG"[..],
            b"GCA",
            b"AACGTAG",
            b"CNACG",
            b"GCNAC",
            b"TT",
            b"CCCC",
            b"TTGCA",
        ] {
            assert_eq!(
                cache.interval(&index, kmer),
                index.backward_search(kmer),
                "kmer {}",
                String::from_utf8_lossy(kmer)
            );
        }
    }

    #[test]
    fn test_absent_words_are_empty() {
        let seqs: Vec<&[u8]> = vec![b"AAAAAAAA"];
        let (index, _) = FmIndex::build(&seqs).unwrap();
        let cache = IntervalCache::build(&index, 2);
        assert_eq!(cache.interval(&index, b"AC"), None);
        assert_eq!(cache.interval(&index, b"AAA").map(|i| i.size()), Some(6));
    }
}
