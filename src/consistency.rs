use crate::dna::normalize;
use crate::extension::{align_to_window, edit_budget};
use log::debug;

#[derive(Debug, Clone)]
pub struct ConsistencyParams {
    /// Edits allowed per query base for a query to count as aligned
    pub max_edit_rate: f64,
    /// Largest allowed spread between query start offsets
    pub start_tolerance: usize,
}

impl Default for ConsistencyParams {
    fn default() -> Self {
        Self {
            max_edit_rate: 0.1,
            start_tolerance: 2,
        }
    }
}

/// Check that every query aligns to `ref_string` at the same start offset.
///
/// A query that does not align within the edit budget, or whose best
/// placement in `ref_string` is ambiguous, makes the whole set inconsistent.
/// An empty query set is trivially consistent.
pub fn check_alignments_are_consistent(
    ref_string: &[u8],
    queries: &[Vec<u8>],
    params: &ConsistencyParams,
) -> bool {
    let target = normalize(ref_string);
    let mut min_start = usize::MAX;
    let mut max_start = 0;

    for (i, query) in queries.iter().enumerate() {
        let query = normalize(query);
        let Some(hit) = align_to_window(&query, &target, params.start_tolerance) else {
            debug!("Query {i} does not align to the reference window");
            return false;
        };
        if hit.edits > edit_budget(query.len(), params.max_edit_rate) {
            debug!("Query {} needs {} edits to align", i, hit.edits);
            return false;
        }
        if hit.ambiguous {
            debug!("Query {i} has more than one best placement");
            return false;
        }
        min_start = min_start.min(hit.start);
        max_start = max_start.max(hit.start);
    }

    queries.is_empty() || max_start - min_start <= params.start_tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::random_sequence;

    #[test]
    fn test_haplotypes_at_same_offset_are_consistent() {
        let reference = random_sequence(200, 5);
        let mut variant = reference[40..140].to_vec();
        variant[50] = if variant[50] == b'G' { b'T' } else { b'G' };
        let queries = vec![reference[40..140].to_vec(), variant];

        let params = ConsistencyParams::default();
        assert!(check_alignments_are_consistent(&reference, &queries, &params));

        let reversed: Vec<Vec<u8>> = queries.iter().rev().cloned().collect();
        assert!(check_alignments_are_consistent(&reference, &reversed, &params));
    }

    #[test]
    fn test_shifted_query_is_inconsistent() {
        let reference = random_sequence(200, 6);
        let queries = vec![reference[10..60].to_vec(), reference[100..150].to_vec()];
        let params = ConsistencyParams::default();
        assert!(!check_alignments_are_consistent(&reference, &queries, &params));

        let reversed: Vec<Vec<u8>> = queries.iter().rev().cloned().collect();
        assert!(!check_alignments_are_consistent(&reference, &reversed, &params));
    }

    #[test]
    fn test_unaligned_or_repeated_query_fails() {
        let reference = random_sequence(120, 8);
        let foreign = vec![reference[0..40].to_vec(), random_sequence(40, 1234)];
        assert!(!check_alignments_are_consistent(&reference, &foreign, &ConsistencyParams::default()));

        let unit = random_sequence(30, 77);
        let mut repeated = unit.clone();
        repeated.extend(random_sequence(20, 78));
        repeated.extend(&unit);
        assert!(!check_alignments_are_consistent(&repeated, &[unit], &ConsistencyParams::default()));

        assert!(!check_alignments_are_consistent(&reference, &[Vec::new()], &ConsistencyParams::default()));
        assert!(check_alignments_are_consistent(&reference, &[], &ConsistencyParams::default()));
    }
}
