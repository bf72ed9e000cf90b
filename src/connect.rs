//! Closing the unsequenced gap between the two mates of a read pair.

use crate::dna::{normalize, reverse_complement};
use crate::overlap::OverlapOracle;
use crate::parallel::{PostProcessor, SequenceProcessor};
use crate::sequence_store::SeqRecord;
use log::info;
use std::io::{self, Write};

/// The two mates of one fragment, as read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemPair {
    pub first: SeqRecord,
    pub second: SeqRecord,
}

impl WorkItemPair {
    pub fn new(first: SeqRecord, second: SeqRecord) -> Self {
        Self { first, second }
    }
}

/// Outcome of resolving one pair; an empty sequence means the gap stays open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectResult {
    pub resolved_sequence: Vec<u8>,
}

impl ConnectResult {
    pub fn is_resolved(&self) -> bool {
        !self.resolved_sequence.is_empty()
    }
}

/// Resolves pairs against a shared, read-only overlap oracle.
pub struct ConnectProcess<'a, O: OverlapOracle> {
    oracle: &'a O,
    min_overlap: usize,
}

impl<'a, O: OverlapOracle> ConnectProcess<'a, O> {
    pub fn new(oracle: &'a O, min_overlap: usize) -> Self {
        Self { oracle, min_overlap }
    }

    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    /// Join the first mate to the reverse complement of the second.
    pub fn process(&self, pair: &WorkItemPair) -> ConnectResult {
        let first = normalize(&pair.first.sequence);
        let second = reverse_complement(&normalize(&pair.second.sequence));
        ConnectResult {
            resolved_sequence: self
                .oracle
                .resolve(&first, &second, self.min_overlap)
                .unwrap_or_default(),
        }
    }
}

impl<O: OverlapOracle> Clone for ConnectProcess<'_, O> {
    fn clone(&self) -> Self {
        Self {
            oracle: self.oracle,
            min_overlap: self.min_overlap,
        }
    }
}

impl<O: OverlapOracle> SequenceProcessor for ConnectProcess<'_, O> {
    type Item = WorkItemPair;
    type Output = ConnectResult;

    fn process(&mut self, item: &WorkItemPair) -> ConnectResult {
        ConnectProcess::process(self, item)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectStats {
    pub resolved: usize,
    pub unresolved: usize,
}

impl ConnectStats {
    pub fn total(&self) -> usize {
        self.resolved + self.unresolved
    }
}

/// Writes one record per pair to the output stream, in the order received.
pub struct ConnectPostProcess<W: Write> {
    writer: W,
    stats: ConnectStats,
}

impl<W: Write> ConnectPostProcess<W> {
    /// Create the sink and write the header line.
    pub fn new(mut writer: W, min_overlap: usize) -> io::Result<Self> {
        writeln!(writer, "HT\tVN:i:1\tOL:i:{min_overlap}")?;
        Ok(Self {
            writer,
            stats: ConnectStats::default(),
        })
    }

    pub fn process(&mut self, pair: &WorkItemPair, result: &ConnectResult) -> io::Result<()> {
        let (sequence, status) = if result.is_resolved() {
            self.stats.resolved += 1;
            (String::from_utf8_lossy(&result.resolved_sequence), "resolved")
        } else {
            self.stats.unresolved += 1;
            ("*".into(), "unresolved")
        };
        writeln!(
            self.writer,
            "PR\t{}\t{}\t{}\tLN:i:{}\tST:Z:{}",
            pair.first.name,
            pair.second.name,
            sequence,
            result.resolved_sequence.len(),
            status
        )
    }

    pub fn stats(&self) -> ConnectStats {
        self.stats
    }

    /// Flush the stream and report the totals.
    pub fn finish(mut self) -> io::Result<ConnectStats> {
        self.writer.flush()?;
        info!(
            "Resolved {} of {} pairs ({} unresolved)",
            self.stats.resolved,
            self.stats.total(),
            self.stats.unresolved
        );
        Ok(self.stats)
    }
}

impl<W: Write> PostProcessor<WorkItemPair, ConnectResult> for ConnectPostProcess<W> {
    fn post_process(&mut self, item: &WorkItemPair, output: ConnectResult) -> io::Result<()> {
        self.process(item, &output)
    }
}

/// Pair up mates from two record streams, or consecutive records of one
/// interleaved stream. Records are pulled only as pairs are requested.
pub fn pair_records<I>(mate1: I, mate2: Option<I>) -> PairedRecords<I::IntoIter>
where
    I: IntoIterator<Item = io::Result<SeqRecord>>,
{
    PairedRecords {
        mate1: mate1.into_iter(),
        mate2: mate2.map(IntoIterator::into_iter),
        pairs: 0,
        done: false,
    }
}

/// Iterator over [`WorkItemPair`]s; stops after the first error.
pub struct PairedRecords<I> {
    mate1: I,
    mate2: Option<I>,
    pairs: usize,
    done: bool,
}

impl<I: Iterator<Item = io::Result<SeqRecord>>> PairedRecords<I> {
    fn next_pair(&mut self) -> Option<io::Result<WorkItemPair>> {
        let first = self.mate1.next();
        let second = match (&first, self.mate2.as_mut()) {
            (_, Some(mate2)) => mate2.next(),
            (Some(_), None) => self.mate1.next(),
            (None, None) => None,
        };

        match (first, second) {
            (None, None) => None,
            (Some(Err(e)), _) | (_, Some(Err(e))) => Some(Err(e)),
            (Some(Ok(first)), Some(Ok(second))) => {
                self.pairs += 1;
                Some(Ok(WorkItemPair::new(first, second)))
            }
            _ => {
                let message = if self.mate2.is_some() {
                    format!("Mate files have different record counts (differ after {} pairs)", self.pairs)
                } else {
                    format!("Interleaved input has an odd number of records (after {} pairs)", self.pairs)
                };
                Some(Err(io::Error::new(io::ErrorKind::InvalidInput, message)))
            }
        }
    }
}

impl<I: Iterator<Item = io::Result<SeqRecord>>> Iterator for PairedRecords<I> {
    type Item = io::Result<WorkItemPair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_pair();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::random_sequence;
    use crate::overlap::SuffixPrefixOracle;

    fn pair_with_overlap(fragment: &[u8], read_len: usize) -> WorkItemPair {
        WorkItemPair::new(
            SeqRecord::new("frag/1", fragment[..read_len].to_vec()),
            SeqRecord::new("frag/2", reverse_complement(&fragment[fragment.len() - read_len..])),
        )
    }

    /// Oracle that always reports the same answer.
    struct Fixed(Option<Vec<u8>>);

    impl OverlapOracle for Fixed {
        fn resolve(&self, _first: &[u8], _second: &[u8], _min_overlap: usize) -> Option<Vec<u8>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_overlapping_mates_resolve() {
        let fragment = random_sequence(90, 31);
        let pair = pair_with_overlap(&fragment, 60);
        let oracle = SuffixPrefixOracle::default();

        let result = ConnectProcess::new(&oracle, 20).process(&pair);
        assert!(result.is_resolved());
        assert_eq!(result.resolved_sequence, fragment);

        let result = ConnectProcess::new(&oracle, 40).process(&pair);
        assert_eq!(result, ConnectResult::default());
    }

    #[test]
    fn test_oracle_failure_is_empty() {
        let pair = pair_with_overlap(&random_sequence(90, 32), 60);
        let result = ConnectProcess::new(&Fixed(None), 10).process(&pair);
        assert!(!result.is_resolved());

        let result = ConnectProcess::new(&Fixed(Some(b"ACGT".to_vec())), 10).process(&pair);
        assert_eq!(result.resolved_sequence, b"ACGT".to_vec());
    }

    #[test]
    fn test_post_process_writes_one_record_per_pair() {
        let pair = WorkItemPair::new(SeqRecord::new("p/1", b"AC".to_vec()), SeqRecord::new("p/2", b"GT".to_vec()));
        let mut sink = ConnectPostProcess::new(Vec::new(), 20).unwrap();
        sink.process(
            &pair,
            &ConnectResult {
                resolved_sequence: b"ACGT".to_vec(),
            },
        )
        .unwrap();
        sink.process(&pair, &ConnectResult::default()).unwrap();
        assert_eq!(
            sink.stats(),
            ConnectStats {
                resolved: 1,
                unresolved: 1
            }
        );

        let text = String::from_utf8(sink.writer).unwrap();
        assert_eq!(
            text,
            "HT\tVN:i:1\tOL:i:20\n\
             PR\tp/1\tp/2\tACGT\tLN:i:4\tST:Z:resolved\n\
             PR\tp/1\tp/2\t*\tLN:i:0\tST:Z:unresolved\n"
        );
    }

    #[test]
    fn test_pair_records() {
        let r = |n: &str| Ok(SeqRecord::new(n, b"A".to_vec()));
        let pairs: Vec<WorkItemPair> = pair_records(vec![r("a/1"), r("b/1")], Some(vec![r("a/2"), r("b/2")]))
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].second.name, "b/2");

        let pairs: Vec<WorkItemPair> = pair_records(vec![r("a/1"), r("a/2"), r("b/1"), r("b/2")], None)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(pairs[1].first.name, "b/1");

        assert!(pair_records(vec![r("a/1")], None).collect::<io::Result<Vec<_>>>().is_err());
        assert!(pair_records(vec![r("a/1")], Some(vec![])).collect::<io::Result<Vec<_>>>().is_err());
        assert!(pair_records(vec![], Some(vec![r("a/2")])).collect::<io::Result<Vec<_>>>().is_err());
    }

    #[test]
    fn test_pairs_are_read_on_demand() {
        let pulled = std::cell::Cell::new(0);
        let records = (0..1000).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok(SeqRecord::new(format!("r{}/{}", i / 2, i % 2 + 1), b"ACGT".to_vec()))
        });

        let mut pairs = pair_records(records, None);
        let first = pairs.next().unwrap().unwrap();
        assert_eq!((first.first.name.as_str(), first.second.name.as_str()), ("r0/1", "r0/2"));
        assert_eq!(pulled.get(), 2);
        assert_eq!(pairs.take(3).count(), 3);
        assert_eq!(pulled.get(), 8);
    }

    #[test]
    fn test_read_error_ends_pairing() {
        let records = vec![
            Ok(SeqRecord::new("a/1", b"A".to_vec())),
            Ok(SeqRecord::new("a/2", b"A".to_vec())),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad record")),
            Ok(SeqRecord::new("b/2", b"A".to_vec())),
        ];
        let mut pairs = pair_records(records, None);
        assert!(pairs.next().unwrap().is_ok());
        assert_eq!(pairs.next().unwrap().unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert!(pairs.next().is_none());
    }
}
