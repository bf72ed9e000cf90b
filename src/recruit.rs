//! Recruiting reads that share a k-mer with candidate haplotypes.

use crate::dna::{normalize, reverse_complement};
use crate::fm_index::FmSearch;
use crate::interval_cache::IntervalCache;
use crate::sampled_sa::PositionRecovery;
use crate::sequence_store::{SeqRecord, SequenceStore};
use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct RecruitParams {
    pub k: usize,
    /// Also search the reverse complement of every haplotype
    pub do_reverse: bool,
    /// k-mers with more hits than this are treated as repeats and ignored
    pub max_kmer_occurrences: usize,
}

impl Default for RecruitParams {
    fn default() -> Self {
        Self {
            k: 31,
            do_reverse: false,
            max_kmer_occurrences: 1000,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecruitedReads {
    /// Reads sharing a k-mer with a haplotype, in read id order
    pub reads: Vec<SeqRecord>,
    /// The mate of every recruited read that has one
    pub mates: Vec<SeqRecord>,
}

/// Collect the reads that share at least one `k`-mer with any haplotype,
/// along with their mates. Haplotypes shorter than `k` contribute nothing.
pub fn extract_haplotype_reads<I, P, S>(
    haplotypes: &[Vec<u8>],
    index: &I,
    cache: &IntervalCache,
    ssa: &P,
    reads: &S,
    params: &RecruitParams,
) -> RecruitedReads
where
    I: FmSearch,
    P: PositionRecovery,
    S: SequenceStore,
{
    let read_ids = haplotypes
        .par_iter()
        .map(|haplotype| haplotype_read_ids(haplotype, index, cache, ssa, params))
        .reduce(FxHashSet::default, |mut acc, ids| {
            acc.extend(ids);
            acc
        });

    let mut read_ids: Vec<u32> = read_ids.into_iter().collect();
    read_ids.sort_unstable();

    let mut recruited = RecruitedReads::default();
    for id in read_ids {
        let Some(read) = fetch_record(reads, id) else {
            debug!("Read id {id} is in the index but not in the read store");
            continue;
        };
        recruited.reads.push(read);
        if let Some(mate) = reads.get_mate_id(id).and_then(|mate_id| fetch_record(reads, mate_id)) {
            recruited.mates.push(mate);
        }
    }

    debug!(
        "Recruited {} reads and {} mates from {} haplotypes (k={})",
        recruited.reads.len(),
        recruited.mates.len(),
        haplotypes.len(),
        params.k
    );
    recruited
}

fn haplotype_read_ids<I, P>(
    haplotype: &[u8],
    index: &I,
    cache: &IntervalCache,
    ssa: &P,
    params: &RecruitParams,
) -> FxHashSet<u32>
where
    I: FmSearch,
    P: PositionRecovery,
{
    let mut ids = FxHashSet::default();
    let k = params.k;
    if k == 0 || haplotype.len() < k {
        return ids;
    }

    let forward = normalize(haplotype);
    let mut strands = vec![forward];
    if params.do_reverse {
        strands.push(reverse_complement(&strands[0]));
    }

    for seq in &strands {
        for kmer in seq.windows(k) {
            if kmer.contains(&b'N') {
                continue;
            }
            let Some(interval) = cache.interval(index, kmer) else {
                continue;
            };
            if interval.size() > params.max_kmer_occurrences {
                continue;
            }
            for row in interval.lower..interval.upper {
                ids.insert(ssa.recover_position(index, row).seq_id);
            }
        }
    }
    ids
}

fn fetch_record<S: SequenceStore>(store: &S, id: u32) -> Option<SeqRecord> {
    Some(SeqRecord::new(store.get_name(id)?, store.get_sequence(id)?.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::random_sequence;
    use crate::index::IndexSet;
    use crate::sequence_store::ReadTable;

    fn reads() -> (ReadTable, Vec<u8>) {
        let genome = random_sequence(600, 99);
        let records = vec![
            SeqRecord::new("a/1", genome[0..50].to_vec()),
            SeqRecord::new("a/2", reverse_complement(&genome[150..200])),
            SeqRecord::new("b/1", genome[300..350].to_vec()),
            SeqRecord::new("b/2", reverse_complement(&genome[450..500])),
            SeqRecord::new("lonely", genome[520..570].to_vec()),
        ];
        (ReadTable::from_records(records).unwrap(), genome)
    }

    #[test]
    fn test_recruits_reads_and_mates() {
        let (table, genome) = reads();
        let index = IndexSet::build(&table, 4, 4).unwrap();
        let params = RecruitParams {
            k: 15,
            ..RecruitParams::default()
        };

        let haplotypes = vec![genome[20..80].to_vec()];
        let recruited = extract_haplotype_reads(&haplotypes, &index.fm, &index.cache, &index.ssa, &table, &params);
        assert_eq!(recruited.reads.len(), 1);
        assert_eq!(recruited.reads[0].name, "a/1");
        assert_eq!(recruited.mates.len(), 1);
        assert_eq!(recruited.mates[0].name, "a/2");
    }

    #[test]
    fn test_reverse_search_finds_opposite_strand_reads() {
        let (table, genome) = reads();
        let index = IndexSet::build(&table, 4, 4).unwrap();
        let haplotypes = vec![genome[440..480].to_vec(), genome[530..560].to_vec()];

        let forward_only = RecruitParams {
            k: 15,
            ..RecruitParams::default()
        };
        let recruited =
            extract_haplotype_reads(&haplotypes, &index.fm, &index.cache, &index.ssa, &table, &forward_only);
        let names: Vec<&str> = recruited.reads.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["lonely"]);
        assert!(recruited.mates.is_empty());

        let both = RecruitParams {
            do_reverse: true,
            ..forward_only
        };
        let recruited = extract_haplotype_reads(&haplotypes, &index.fm, &index.cache, &index.ssa, &table, &both);
        let names: Vec<&str> = recruited.reads.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b/2", "lonely"]);
        assert_eq!(recruited.mates[0].name, "b/1");
    }

    #[test]
    fn test_short_haplotype_recruits_nothing() {
        let (table, genome) = reads();
        let index = IndexSet::build(&table, 4, 4).unwrap();
        let params = RecruitParams {
            k: 15,
            do_reverse: true,
            ..RecruitParams::default()
        };
        let haplotypes = vec![genome[0..10].to_vec()];
        let recruited = extract_haplotype_reads(&haplotypes, &index.fm, &index.cache, &index.ssa, &table, &params);
        assert_eq!(recruited, RecruitedReads::default());
    }
}
