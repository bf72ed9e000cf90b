use std::cmp::Ordering;
use std::fmt;

/// Strand orientation of a placement
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// The placement of a query sequence onto a reference sequence.
///
/// Placements order by `(reference_id, position)` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub reference_id: u32,
    pub position: usize,
    pub length: usize,
    pub score: i32,
    pub strand: Strand,
}

impl Placement {
    pub fn new(reference_id: u32, position: usize, length: usize, score: i32, strand: Strand) -> Self {
        Self {
            reference_id,
            position,
            length,
            score,
            strand,
        }
    }

    /// End coordinate (exclusive) on the reference.
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    pub fn is_reverse_complement(&self) -> bool {
        self.strand == Strand::Reverse
    }

    /// Sort key used for ordering and for coalescing adjacency.
    pub fn locus_key(&self) -> (u32, usize) {
        (self.reference_id, self.position)
    }
}

impl PartialOrd for Placement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Total order on the locus key, with the remaining fields as tie breakers so
// that `Ord` stays consistent with `Eq`.
impl Ord for Placement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.locus_key()
            .cmp(&other.locus_key())
            .then_with(|| self.length.cmp(&other.length))
            .then_with(|| other.score.cmp(&self.score))
            .then_with(|| (self.strand as u8).cmp(&(other.strand as u8)))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R_ID: {} P: [{}, {}]", self.reference_id, self.position, self.end())
    }
}
