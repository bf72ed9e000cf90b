//! Overlap oracle used to close the gap between two mates.

/// Find the single sequence that joins `first` to `second`.
///
/// `second` is expected in the same orientation as `first`. Implementations
/// return `None` when no join of at least `min_overlap` bases exists or when
/// more than one join exists.
pub trait OverlapOracle: Sync {
    fn resolve(&self, first: &[u8], second: &[u8], min_overlap: usize) -> Option<Vec<u8>>;
}

/// Joins two sequences through a direct suffix/prefix overlap, allowing a
/// fixed fraction of mismatches inside the overlap.
#[derive(Debug, Clone, Default)]
pub struct SuffixPrefixOracle {
    pub max_error_rate: f64,
}

impl SuffixPrefixOracle {
    pub fn new(max_error_rate: f64) -> Self {
        Self { max_error_rate }
    }

    fn mismatches(a: &[u8], b: &[u8], limit: usize) -> Option<usize> {
        let mut count = 0;
        for (x, y) in a.iter().zip(b) {
            if !x.eq_ignore_ascii_case(y) || *x == b'N' {
                count += 1;
                if count > limit {
                    return None;
                }
            }
        }
        Some(count)
    }
}

impl OverlapOracle for SuffixPrefixOracle {
    fn resolve(&self, first: &[u8], second: &[u8], min_overlap: usize) -> Option<Vec<u8>> {
        let longest = first.len().min(second.len());
        if min_overlap == 0 || longest < min_overlap {
            return None;
        }

        // Every accepted overlap length closes the gap with a different
        // sequence, so a second accepted length makes the pair ambiguous.
        let mut accepted: Option<usize> = None;
        for overlap in min_overlap..=longest {
            let limit = (overlap as f64 * self.max_error_rate).floor() as usize;
            let suffix = &first[first.len() - overlap..];
            let prefix = &second[..overlap];
            if Self::mismatches(suffix, prefix, limit).is_none() {
                continue;
            }
            if accepted.is_some() {
                return None;
            }
            accepted = Some(overlap);
        }

        let overlap = accepted?;
        let mut joined = Vec::with_capacity(first.len() + second.len() - overlap);
        joined.extend_from_slice(first);
        joined.extend_from_slice(&second[overlap..]);
        Some(joined)
    }
}
