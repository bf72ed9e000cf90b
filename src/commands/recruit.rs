use crate::commands::index::load_indexed_sequences;
use crate::dna::normalize;
use crate::recruit::{extract_haplotype_reads, RecruitParams};
use crate::sequence_store::{read_sequence_file, write_fasta, SeqRecord, SequenceStore};
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Recruit reads sharing a k-mer with any haplotype and write them, and their
/// mates, to `<prefix>.reads.fa` and `<prefix>.mates.fa`.
pub fn run_recruit(
    reads_file: &str,
    haplotypes_file: &str,
    output_prefix: &str,
    params: &RecruitParams,
    sample_rate: usize,
    cache_len: usize,
    force_reindex: bool,
) -> io::Result<()> {
    if params.k == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "k-mer length must be greater than 0",
        ));
    }

    let (reads, index) = load_indexed_sequences(reads_file, sample_rate, cache_len, force_reindex)?;
    let haplotypes: Vec<Vec<u8>> = read_sequence_file(haplotypes_file)?
        .into_iter()
        .map(|record| normalize(&record.sequence))
        .collect();
    info!(
        "Recruiting reads for {} haplotypes from {} reads (k={})",
        haplotypes.len(),
        reads.len(),
        params.k
    );

    let recruited = extract_haplotype_reads(&haplotypes, &index.fm, &index.cache, &index.ssa, &reads, params);

    write_records(&format!("{output_prefix}.reads.fa"), &recruited.reads)?;
    write_records(&format!("{output_prefix}.mates.fa"), &recruited.mates)?;
    info!(
        "Wrote {} reads and {} mates with prefix '{}'",
        recruited.reads.len(),
        recruited.mates.len(),
        output_prefix
    );
    Ok(())
}

fn write_records(path: &str, records: &[SeqRecord]) -> io::Result<()> {
    let file = File::create(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to create output file '{path}': {e}"))
    })?;
    let mut writer = BufWriter::new(file);
    write_fasta(&mut writer, records)?;
    writer.flush()
}
