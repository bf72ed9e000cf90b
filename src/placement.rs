//! Placing haplotypes onto reference coordinates through the FM-index.

use crate::alignment_record::{Placement, Strand};
use crate::dna::{is_reverse_palindrome, normalize, reverse_complement};
use crate::extension::{align_in_band, edit_budget};
use crate::fm_index::FmSearch;
use crate::sampled_sa::PositionRecovery;
use crate::sequence_store::SequenceStore;
use log::debug;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct PlacementParams {
    /// Length of the exact-match seeds; shorter queries seed with their full length
    pub seed_length: usize,
    /// Edits allowed per query base when extending a seed
    pub max_edit_rate: f64,
    /// Seeds occurring more often than this are skipped as repeats
    pub max_seed_hits: usize,
    /// Placements closer than this on the same reference are merged
    pub coalesce_gap: usize,
    pub both_strands: bool,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            seed_length: 21,
            max_edit_rate: 0.05,
            max_seed_hits: 256,
            coalesce_gap: 0,
            both_strands: true,
        }
    }
}

/// Place `haplotype` onto the reference corpus described by `index`/`ssa`.
///
/// The result is coalesced, so it is sorted by `(reference_id, position)`
/// and holds one record per locus. No seed hit means an empty result.
pub fn align_haplotype_to_reference<I, P, S>(
    haplotype: &[u8],
    index: &I,
    ssa: &P,
    reference: &S,
    params: &PlacementParams,
) -> Vec<Placement>
where
    I: FmSearch,
    P: PositionRecovery,
    S: SequenceStore,
{
    let query = normalize(haplotype);
    if query.is_empty() {
        return Vec::new();
    }

    let mut placements = place_strand(&query, Strand::Forward, index, ssa, reference, params);
    // A reverse palindrome would only find the same loci again
    if params.both_strands && !is_reverse_palindrome(&query) {
        let rc = reverse_complement(&query);
        placements.extend(place_strand(&rc, Strand::Reverse, index, ssa, reference, params));
    }

    coalesce_alignments(&mut placements, params.coalesce_gap);
    debug!(
        "Placed haplotype of {} bp at {} locus/loci",
        query.len(),
        placements.len()
    );
    placements
}

fn place_strand<I, P, S>(
    query: &[u8],
    strand: Strand,
    index: &I,
    ssa: &P,
    reference: &S,
    params: &PlacementParams,
) -> Vec<Placement>
where
    I: FmSearch,
    P: PositionRecovery,
    S: SequenceStore,
{
    let query_len = query.len();
    let budget = edit_budget(query_len, params.max_edit_rate);
    let seed_len = params.seed_length.clamp(1, query_len);

    // (reference id, implied start of the query on the reference)
    let mut diagonals: FxHashSet<(u32, i64)> = FxHashSet::default();
    for offset in seed_offsets(query_len, seed_len) {
        let seed = &query[offset..offset + seed_len];
        if seed.contains(&b'N') {
            continue;
        }
        let Some(interval) = index.backward_search(seed) else {
            continue;
        };
        if interval.size() > params.max_seed_hits {
            debug!(
                "Skipping seed at offset {} with {} hits (max {})",
                offset,
                interval.size(),
                params.max_seed_hits
            );
            continue;
        }
        for row in interval.lower..interval.upper {
            let pos = ssa.recover_position(index, row);
            diagonals.insert((pos.seq_id, pos.offset as i64 - offset as i64));
        }
    }

    let mut diagonals: Vec<(u32, i64)> = diagonals.into_iter().collect();
    diagonals.sort_unstable();

    let mut placements = Vec::new();
    for (reference_id, diagonal) in diagonals {
        let Some(ref_seq) = reference.get_sequence(reference_id) else {
            continue;
        };
        let window_start = (diagonal - budget as i64).max(0) as usize;
        let window_end = ((diagonal + (query_len + budget) as i64).max(0) as usize).min(ref_seq.len());
        if window_start >= window_end {
            continue;
        }

        let Some(hit) = align_in_band(
            query,
            &ref_seq[window_start..window_end],
            diagonal - window_start as i64,
            budget,
            0,
        ) else {
            continue;
        };
        if hit.edits > budget || hit.end <= hit.start {
            continue;
        }
        placements.push(Placement::new(
            reference_id,
            window_start + hit.start,
            hit.end - hit.start,
            hit.score(query_len),
            strand,
        ));
    }
    placements
}

/// Seeds anchored at both ends of the query plus one every `seed_len`
/// bases in between.
fn seed_offsets(query_len: usize, seed_len: usize) -> Vec<usize> {
    let last = query_len - seed_len;
    let mut offsets = vec![0];
    let mut offset = seed_len;
    while offset < last {
        offsets.push(offset);
        offset += seed_len;
    }
    if last > 0 {
        offsets.push(last);
    }
    offsets
}

/// Merge placements that describe the same locus.
///
/// Sorts by `(reference_id, position)` and merges each placement into the
/// running one when they share a reference and it starts no more than
/// `max_gap` bases past the running end. The merged record spans the union
/// and keeps the best score and the strand of the leftmost input. Merging
/// chains: A-B and B-C merge into one locus even if A and C are apart.
pub fn coalesce_alignments(alignments: &mut Vec<Placement>, max_gap: usize) {
    if alignments.len() < 2 {
        return;
    }
    alignments.sort();

    let mut write_idx = 0;
    for read_idx in 1..alignments.len() {
        let next = alignments[read_idx];
        let current = &mut alignments[write_idx];
        if current.reference_id == next.reference_id && next.position <= current.end() + max_gap {
            let end = current.end().max(next.end());
            current.length = end - current.position;
            current.score = current.score.max(next.score);
        } else {
            write_idx += 1;
            alignments[write_idx] = next;
        }
    }
    alignments.truncate(write_idx + 1);
}
