//! Reference windows around placements and flanked haplotype sets.

use crate::alignment_record::Placement;
use crate::dna::reverse_complement;
use crate::sequence_store::SequenceStore;
use std::io;

/// Reference bases at a placement plus the flanks around it.
///
/// `defined` always has the placement's length; the flanks are clipped at
/// the contig ends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceWindow {
    pub upstream: Vec<u8>,
    pub defined: Vec<u8>,
    pub downstream: Vec<u8>,
}

impl ReferenceWindow {
    /// `upstream + defined + downstream`
    pub fn full(&self) -> Vec<u8> {
        let mut seq = Vec::with_capacity(self.upstream.len() + self.defined.len() + self.downstream.len());
        seq.extend_from_slice(&self.upstream);
        seq.extend_from_slice(&self.defined);
        seq.extend_from_slice(&self.downstream);
        seq
    }

    /// Attach this window's flanks to `core`.
    pub fn flank(&self, core: &[u8]) -> Vec<u8> {
        let mut seq = Vec::with_capacity(self.upstream.len() + core.len() + self.downstream.len());
        seq.extend_from_slice(&self.upstream);
        seq.extend_from_slice(core);
        seq.extend_from_slice(&self.downstream);
        seq
    }
}

/// Split the reference around `aln` into upstream, defined and downstream parts.
pub fn extract_reference_substrings<S: SequenceStore>(
    aln: &Placement,
    store: &S,
    flanking: usize,
) -> io::Result<ReferenceWindow> {
    let reference = store.get_sequence(aln.reference_id).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Reference id {} not found", aln.reference_id),
        )
    })?;

    if aln.end() > reference.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Placement {} exceeds reference length {}",
                aln,
                reference.len()
            ),
        ));
    }

    let upstream_start = aln.position.saturating_sub(flanking);
    let downstream_end = (aln.end() + flanking).min(reference.len());

    Ok(ReferenceWindow {
        upstream: reference[upstream_start..aln.position].to_vec(),
        defined: reference[aln.position..aln.end()].to_vec(),
        downstream: reference[aln.end()..downstream_end].to_vec(),
    })
}

/// The reference bases covered by `aln`, without flanks.
pub fn extract_reference<S: SequenceStore>(
    aln: &Placement,
    store: &S,
    flanking: usize,
) -> io::Result<Vec<u8>> {
    extract_reference_substrings(aln, store, flanking).map(|window| window.defined)
}

/// Attach reference flanks to every haplotype and append the reference
/// haplotype itself.
///
/// Haplotypes are given in query orientation and are reverse complemented
/// for reverse-strand placements, so every output reads along the reference.
/// On success the output has exactly one more entry than the input.
pub fn make_flanking_haplotypes<S: SequenceStore>(
    aln: &Placement,
    store: &S,
    flanking: usize,
    in_haplotypes: &[Vec<u8>],
) -> io::Result<Vec<Vec<u8>>> {
    let window = extract_reference_substrings(aln, store, flanking)?;

    let mut out_haplotypes = Vec::with_capacity(in_haplotypes.len() + 1);
    for haplotype in in_haplotypes {
        if aln.is_reverse_complement() {
            out_haplotypes.push(window.flank(&reverse_complement(haplotype)));
        } else {
            out_haplotypes.push(window.flank(haplotype));
        }
    }
    out_haplotypes.push(window.full());
    Ok(out_haplotypes)
}

/// Render `query` under the reference bases it was placed on.
pub fn print_alignment<S: SequenceStore>(query: &[u8], aln: &Placement, store: &S) -> io::Result<String> {
    let defined = extract_reference(aln, store, 0)?;
    let oriented = if aln.is_reverse_complement() {
        reverse_complement(query)
    } else {
        query.to_vec()
    };

    let width = defined.len().max(oriented.len());
    let matches: String = (0..width)
        .map(|i| match (defined.get(i), oriented.get(i)) {
            (Some(r), Some(q)) if r.eq_ignore_ascii_case(q) => '|',
            _ => ' ',
        })
        .collect();

    Ok(format!(
        "{} ({})\nREF {}\n    {}\nHAP {}",
        aln,
        aln.strand.symbol(),
        String::from_utf8_lossy(&defined),
        matches.trim_end(),
        String::from_utf8_lossy(&oriented)
    ))
}
