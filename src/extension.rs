//! Semi-global edit-distance alignment: the whole query against any
//! substring of the target.

/// Result of aligning a query into a target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Start of the aligned span in the target
    pub start: usize,
    /// End (exclusive) of the aligned span in the target
    pub end: usize,
    pub edits: usize,
    /// Another optimum starts more than the tolerance away from `start`
    pub ambiguous: bool,
}

impl WindowHit {
    /// Matched bases minus edits; higher is better.
    pub fn score(&self, query_len: usize) -> i32 {
        query_len as i32 - 2 * self.edits as i32
    }
}

/// Cost of cells outside the band
const UNREACHABLE: usize = usize::MAX / 2;

/// Align all of `query` to the best-matching substring of `target`.
///
/// Returns `None` when either sequence is empty. Among optimal alignments
/// the leftmost start wins; `ambiguous` is set when optimal starts spread
/// further than `start_tolerance`.
pub fn align_to_window(query: &[u8], target: &[u8], start_tolerance: usize) -> Option<WindowHit> {
    semi_global(query, target, None, start_tolerance)
}

/// Like [`align_to_window`], but query base `i` may only pair with target
/// columns within `band` of `diagonal + i`, so the cost is linear in the
/// query length for a fixed band.
pub fn align_in_band(
    query: &[u8],
    target: &[u8],
    diagonal: i64,
    band: usize,
    start_tolerance: usize,
) -> Option<WindowHit> {
    semi_global(query, target, Some((diagonal, band)), start_tolerance)
}

/// Columns (1-based, inclusive) of DP row `i`, or `None` when the band
/// has left the target.
fn row_columns(i: usize, n: usize, band: Option<(i64, usize)>) -> Option<(usize, usize)> {
    let Some((diagonal, width)) = band else {
        return Some((1, n));
    };
    let center = diagonal + i as i64;
    let lo = (center - width as i64).max(0);
    let hi = (center + width as i64).min(n as i64 - 1);
    (lo <= hi).then_some((lo as usize + 1, hi as usize + 1))
}

fn semi_global(
    query: &[u8],
    target: &[u8],
    band: Option<(i64, usize)>,
    start_tolerance: usize,
) -> Option<WindowHit> {
    if query.is_empty() || target.is_empty() {
        return None;
    }
    let n = target.len();

    // cost row and the target column each cell's alignment started at
    let mut prev_cost: Vec<usize> = match band {
        None => vec![0; n + 1],
        Some((diagonal, width)) => (0..=n as i64)
            .map(|j| if (j - diagonal).unsigned_abs() as usize <= width { 0 } else { UNREACHABLE })
            .collect(),
    };
    let mut prev_start: Vec<usize> = (0..=n).collect();
    let mut cost = vec![UNREACHABLE; n + 1];
    let mut start = vec![0usize; n + 1];
    let mut columns = (1, n);

    for (i, &q) in query.iter().enumerate() {
        let (lo, hi) = row_columns(i, n, band)?;
        // the cells just outside the band are read by this row and the next
        cost[lo - 1] = if lo == 1 { i + 1 } else { UNREACHABLE };
        start[lo - 1] = 0;
        if hi < n {
            cost[hi + 1] = UNREACHABLE;
        }

        for j in lo..=hi {
            let mismatch = usize::from(!q.eq_ignore_ascii_case(&target[j - 1]) || q == b'N');
            let diagonal = prev_cost[j - 1] + mismatch;
            let insertion = prev_cost[j] + 1;
            let deletion = cost[j - 1] + 1;

            if diagonal <= insertion && diagonal <= deletion {
                cost[j] = diagonal;
                start[j] = prev_start[j - 1];
            } else if insertion <= deletion {
                cost[j] = insertion;
                start[j] = prev_start[j];
            } else {
                cost[j] = deletion;
                start[j] = start[j - 1];
            }
        }
        std::mem::swap(&mut prev_cost, &mut cost);
        std::mem::swap(&mut prev_start, &mut start);
        columns = (lo, hi);
    }

    let (lo, hi) = columns;
    let best = *prev_cost[lo..=hi].iter().min()?;
    if best >= UNREACHABLE {
        return None;
    }
    let mut chosen: Option<(usize, usize)> = None;
    let mut min_start = usize::MAX;
    let mut max_start = 0;
    for j in lo..=hi {
        if prev_cost[j] != best {
            continue;
        }
        let s = prev_start[j];
        min_start = min_start.min(s);
        max_start = max_start.max(s);
        if chosen.map_or(true, |(cs, ce)| (s, j) < (cs, ce)) {
            chosen = Some((s, j));
        }
    }
    let (start, end) = chosen?;

    Some(WindowHit {
        start,
        end,
        edits: best,
        ambiguous: max_start - min_start > start_tolerance,
    })
}

/// Maximum edits allowed for a query of `len` bases at `rate`.
pub fn edit_budget(len: usize, rate: f64) -> usize {
    (len as f64 * rate).floor() as usize
}
