use crate::alignment_record::Placement;
use crate::commands::index::load_indexed_sequences;
use crate::consistency::{check_alignments_are_consistent, ConsistencyParams};
use crate::dna::normalize;
use crate::placement::{align_haplotype_to_reference, PlacementParams};
use crate::sequence_store::{read_sequence_file, write_fasta, ReadTable, SeqRecord, SequenceStore};
use crate::window::{extract_reference_substrings, make_flanking_haplotypes, print_alignment};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};

#[derive(Debug, Clone)]
pub struct PlaceOptions {
    pub reference: String,
    pub haplotypes: String,
    pub params: PlacementParams,
    pub flanking: usize,
    pub flanking_out: Option<String>,
    pub print_alignments: bool,
    pub sample_rate: usize,
    pub cache_len: usize,
    pub force_reindex: bool,
}

/// Place haplotypes on the reference and write one TSV line per placement.
pub fn run_place(options: &PlaceOptions) -> io::Result<()> {
    let (reference, index) = load_indexed_sequences(
        &options.reference,
        options.sample_rate,
        options.cache_len,
        options.force_reindex,
    )?;
    let haplotypes: Vec<SeqRecord> = read_sequence_file(&options.haplotypes)?
        .into_iter()
        .map(|record| SeqRecord::new(record.name, normalize(&record.sequence)))
        .collect();
    info!("Placing {} haplotypes", haplotypes.len());

    let placed: Vec<Vec<Placement>> = haplotypes
        .par_iter()
        .map(|haplotype| {
            align_haplotype_to_reference(
                &haplotype.sequence,
                &index.fm,
                &index.ssa,
                &reference,
                &options.params,
            )
        })
        .collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut flanking_out = match &options.flanking_out {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut num_placed = 0;
    for (haplotype, placements) in haplotypes.iter().zip(&placed) {
        if placements.is_empty() {
            debug!("No placement for haplotype '{}'", haplotype.name);
            continue;
        }
        num_placed += 1;

        for (i, placement) in placements.iter().enumerate() {
            write_placement(&mut out, &haplotype.name, placement, &reference)?;

            if options.print_alignments {
                match print_alignment(&haplotype.sequence, placement, &reference) {
                    Ok(rendered) => debug!("{}:\n{}", haplotype.name, rendered),
                    Err(e) => warn!("Cannot render alignment of '{}': {}", haplotype.name, e),
                }
            }

            if options.flanking > 0 {
                let flanked = flank_haplotype(haplotype, i, placement, &reference, options.flanking)?;
                if let Some(writer) = flanking_out.as_mut() {
                    write_fasta(writer, &flanked)?;
                }
            }
        }
    }

    out.flush()?;
    if let Some(mut writer) = flanking_out {
        writer.flush()?;
    }
    info!("Placed {} of {} haplotypes", num_placed, haplotypes.len());
    Ok(())
}

fn write_placement<W: Write>(
    out: &mut W,
    haplotype_name: &str,
    placement: &Placement,
    reference: &ReadTable,
) -> io::Result<()> {
    let reference_name = reference.get_name(placement.reference_id).unwrap_or("*");
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}",
        haplotype_name,
        reference_name,
        placement.position,
        placement.end(),
        placement.score,
        placement.strand.symbol()
    )
}

/// Flank the haplotype at one of its placements and check that the flanked
/// set still lines up with the reference window.
fn flank_haplotype(
    haplotype: &SeqRecord,
    placement_idx: usize,
    placement: &Placement,
    reference: &ReadTable,
    flanking: usize,
) -> io::Result<Vec<SeqRecord>> {
    let flanked = make_flanking_haplotypes(
        placement,
        reference,
        flanking,
        std::slice::from_ref(&haplotype.sequence),
    )?;
    let window = extract_reference_substrings(placement, reference, flanking)?;
    if !check_alignments_are_consistent(&window.full(), &flanked, &ConsistencyParams::default()) {
        warn!(
            "Flanked haplotypes of '{}' at {} do not align consistently to the reference window",
            haplotype.name, placement
        );
    }

    let last = flanked.len() - 1;
    Ok(flanked
        .into_iter()
        .enumerate()
        .map(|(i, seq)| {
            let suffix = if i == last { "ref".to_string() } else { i.to_string() };
            SeqRecord::new(format!("{}.{}.{}", haplotype.name, placement_idx, suffix), seq)
        })
        .collect())
}
