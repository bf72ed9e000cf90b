//! Nucleotide helpers shared by the index, the placement engine and the
//! gap resolver.

/// Size of the index alphabet: `$`, `A`, `C`, `G`, `T`, `N`.
pub const ALPHABET_SIZE: usize = 6;

/// Rank of the sequence separator in the index alphabet.
pub const SENTINEL_RANK: u8 = 0;

/// Rank of an ACGT/N base in the index alphabet (`$` is rank 0).
#[inline]
pub fn base_rank(base: u8) -> u8 {
    match base {
        b'A' | b'a' => 1,
        b'C' | b'c' => 2,
        b'G' | b'g' => 3,
        b'T' | b't' => 4,
        _ => 5,
    }
}

/// Two-bit code for ACGT, `None` for anything else.
#[inline]
pub fn two_bit(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Uppercase the sequence and replace anything outside ACGT with `N`.
pub fn normalize(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&base| match base.to_ascii_uppercase() {
            b @ (b'A' | b'C' | b'G' | b'T') => b,
            _ => b'N',
        })
        .collect()
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            b'N' | b'n' => b'N',
            _ => base,
        })
        .collect()
}

/// True when the sequence reads the same on both strands.
pub fn is_reverse_palindrome(seq: &[u8]) -> bool {
    reverse_complement(seq).eq_ignore_ascii_case(seq)
}

/// Deterministic pseudo-random ACGT sequence for tests.
#[cfg(test)]
pub(crate) fn random_sequence(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4]
        })
        .collect()
}
