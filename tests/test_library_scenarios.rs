//! End-to-end checks of the library API on small synthetic genomes.

use hapconnect::alignment_record::{Placement, Strand};
use hapconnect::connect::{ConnectPostProcess, ConnectProcess, WorkItemPair};
use hapconnect::consistency::{check_alignments_are_consistent, ConsistencyParams};
use hapconnect::dna::reverse_complement;
use hapconnect::index::IndexSet;
use hapconnect::overlap::SuffixPrefixOracle;
use hapconnect::parallel::{process_parallel, HarnessConfig};
use hapconnect::placement::{align_haplotype_to_reference, coalesce_alignments, PlacementParams};
use hapconnect::recruit::{extract_haplotype_reads, RecruitParams};
use hapconnect::sequence_store::{ReadTable, SeqRecord};
use hapconnect::window::{extract_reference, extract_reference_substrings, make_flanking_haplotypes};

fn lcg_sequence(len: usize, seed: u64, alphabet: &[u8]) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            alphabet[(state >> 33) as usize % alphabet.len()]
        })
        .collect()
}

fn table(records: Vec<(&str, Vec<u8>)>) -> ReadTable {
    ReadTable::from_records(records.into_iter().map(|(name, seq)| SeqRecord::new(name, seq))).unwrap()
}

#[test]
fn test_exact_haplotype_is_placed_once() {
    // No G or T outside the planted copy, so it is the only occurrence
    let mut contig = lcg_sequence(300, 1, b"AC");
    contig[100..108].copy_from_slice(b"ACGTACGT");
    let reference = table(vec![("chr1", contig), ("chr2", lcg_sequence(200, 2, b"AC"))]);
    let index = IndexSet::build(&reference, 4, 4).unwrap();

    let placements = align_haplotype_to_reference(
        b"ACGTACGT",
        &index.fm,
        &index.ssa,
        &reference,
        &PlacementParams::default(),
    );
    assert_eq!(placements.len(), 1);
    let placement = placements[0];
    assert_eq!(placement.reference_id, 0);
    assert_eq!(placement.position, 100);
    assert_eq!(placement.length, 8);
    assert!(!placement.is_reverse_complement());
    assert_eq!(extract_reference(&placement, &reference, 0).unwrap(), b"ACGTACGT".to_vec());
}

#[test]
fn test_overlapping_placements_coalesce() {
    let mut placements = vec![
        Placement::new(0, 104, 8, 8, Strand::Forward),
        Placement::new(0, 100, 8, 8, Strand::Forward),
    ];
    coalesce_alignments(&mut placements, 0);
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].locus_key(), (0, 100));
    assert_eq!(placements[0].length, 12);
}

#[test]
fn test_reverse_strand_haplotype_with_flanks() {
    let contig = lcg_sequence(600, 3, b"ACGT");
    let reference = table(vec![("chr1", contig.clone())]);
    let index = IndexSet::build(&reference, 8, 6).unwrap();

    let haplotype = reverse_complement(&contig[250..330]);
    let placements =
        align_haplotype_to_reference(&haplotype, &index.fm, &index.ssa, &reference, &PlacementParams::default());
    assert_eq!(placements, vec![Placement::new(0, 250, 80, 80, Strand::Reverse)]);

    let flanked = make_flanking_haplotypes(&placements[0], &reference, 30, &[haplotype]).unwrap();
    assert_eq!(flanked.len(), 2);
    assert_eq!(flanked[0], contig[220..360].to_vec());
    assert_eq!(flanked[1], contig[220..360].to_vec());

    let window = extract_reference_substrings(&placements[0], &reference, 30).unwrap();
    assert!(check_alignments_are_consistent(&window.full(), &flanked, &ConsistencyParams::default()));
}

#[test]
fn test_read_pairs_resolve_in_input_order() {
    let oracle = SuffixPrefixOracle::default();
    let pairs: Vec<WorkItemPair> = (0..25u64)
        .map(|i| {
            let fragment = lcg_sequence(90, 100 + i, b"ACGT");
            // every third pair has mates that do not overlap
            let second_start = if i % 3 == 0 { 60 } else { 30 };
            let second_end = (second_start + 60).min(fragment.len());
            WorkItemPair::new(
                SeqRecord::new(format!("frag{i}/1"), fragment[..60].to_vec()),
                SeqRecord::new(
                    format!("frag{i}/2"),
                    reverse_complement(&fragment[second_start..second_end]),
                ),
            )
        })
        .collect();

    let processor = ConnectProcess::new(&oracle, 20);
    assert!(processor.process(&pairs[1]).is_resolved());
    assert!(!ConnectProcess::new(&oracle, 40).process(&pairs[1]).is_resolved());

    let mut sink = ConnectPostProcess::new(Vec::new(), 20).unwrap();
    let config = HarnessConfig {
        num_threads: 4,
        batch_size: 2,
    };
    let count = process_parallel(pairs, &processor, &mut sink, config).unwrap();
    assert_eq!(count, 25);
    let stats = sink.stats();
    assert_eq!(stats.unresolved, 9);
    assert_eq!(stats.resolved, 16);
}

#[test]
fn test_short_haplotype_recruits_nothing() {
    let genome = lcg_sequence(400, 5, b"ACGT");
    let reads = table(vec![
        ("r1/1", genome[0..50].to_vec()),
        ("r1/2", reverse_complement(&genome[100..150])),
        ("r2/1", genome[200..250].to_vec()),
        ("r2/2", reverse_complement(&genome[300..350])),
    ]);
    let index = IndexSet::build(&reads, 4, 6).unwrap();
    let params = RecruitParams {
        k: 15,
        ..RecruitParams::default()
    };

    let recruited = extract_haplotype_reads(
        &[genome[10..20].to_vec()],
        &index.fm,
        &index.cache,
        &index.ssa,
        &reads,
        &params,
    );
    assert!(recruited.reads.is_empty());
    assert!(recruited.mates.is_empty());

    let recruited = extract_haplotype_reads(
        &[genome[10..60].to_vec()],
        &index.fm,
        &index.cache,
        &index.ssa,
        &reads,
        &params,
    );
    let names: Vec<&str> = recruited.reads.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["r1/1"]);
    assert_eq!(recruited.mates.len(), 1);
    assert_eq!(recruited.mates[0].name, "r1/2");
}

#[test]
fn test_window_at_contig_start_has_no_upstream() {
    let reference = table(vec![("chr1", lcg_sequence(100, 6, b"ACGT"))]);
    let placement = Placement::new(0, 0, 20, 20, Strand::Forward);
    for flanking in [0, 5, 50, 500] {
        let window = extract_reference_substrings(&placement, &reference, flanking).unwrap();
        assert!(window.upstream.is_empty());
        assert_eq!(window.defined.len(), 20);
        assert_eq!(window.downstream.len(), flanking.min(80));
    }
}
