use crate::dna::normalize;
use crate::seqidx::SequenceIndex;
use log::{debug, warn};
use noodles::{bgzf, fasta, fastq};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Read names ending in `/1`, `/2` (or `.1`, `_2`, ...) are mates of the stem.
const MATE_PATTERN: &str = r"^(.+)[/._]([12])$";

// Trait for id-addressable sequence retrieval (references or reads)
pub trait SequenceStore: Sync {
    fn get_sequence(&self, id: u32) -> Option<&[u8]>;
    fn get_name(&self, id: u32) -> Option<&str>;
    fn get_mate_id(&self, id: u32) -> Option<u32>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sequence_length(&self, id: u32) -> Option<usize> {
        self.get_sequence(id).map(<[u8]>::len)
    }
}

/// A named sequence as read from disk or produced by recruitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub name: String,
    pub sequence: Vec<u8>,
}

impl SeqRecord {
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }
}

/// In-memory store of normalised sequences with name lookup and mate links.
#[derive(Debug, Default)]
pub struct ReadTable {
    pub seq_index: SequenceIndex,
    sequences: Vec<Vec<u8>>,
    mates: Vec<Option<u32>>,
}

impl ReadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records, linking mates by name.
    pub fn from_records<I>(records: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = SeqRecord>,
    {
        let mut table = ReadTable::new();
        for record in records {
            table.push(&record.name, &record.sequence);
        }
        table.pair_mates()?;
        Ok(table)
    }

    pub fn from_files(files: &[String]) -> io::Result<Self> {
        if files.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "No input files provided",
            ));
        }

        let mut records = Vec::new();
        for file in files {
            records.extend(read_sequence_file(file)?);
        }
        let table = ReadTable::from_records(records)?;
        debug!("Loaded {} sequences from {} file(s)", table.len(), files.len());
        Ok(table)
    }

    /// Add a sequence, returning its id. A repeated name replaces the
    /// earlier sequence.
    pub fn push(&mut self, name: &str, sequence: &[u8]) -> u32 {
        let id = self.seq_index.get_or_insert_id(name);
        let normalized = normalize(sequence);
        if (id as usize) < self.sequences.len() {
            warn!("Duplicate sequence name '{name}', keeping the last occurrence");
            self.sequences[id as usize] = normalized;
        } else {
            self.sequences.push(normalized);
            self.mates.push(None);
        }
        id
    }

    /// Link `<stem>/1` with `<stem>/2` for every stem that has both ends.
    pub fn pair_mates(&mut self) -> io::Result<()> {
        let pattern = Regex::new(MATE_PATTERN).map_err(io::Error::other)?;
        let mut ends: FxHashMap<&str, [Option<u32>; 2]> = FxHashMap::default();

        for id in 0..self.sequences.len() as u32 {
            let Some(name) = self.seq_index.get_name(id) else {
                continue;
            };
            if let Some(caps) = pattern.captures(name) {
                let (Some(stem), Some(end)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let slot = if end.as_str() == "1" { 0 } else { 1 };
                ends.entry(stem.as_str()).or_default()[slot] = Some(id);
            }
        }

        let mut links = Vec::new();
        for pair in ends.values() {
            if let [Some(first), Some(second)] = *pair {
                links.push((first, second));
            }
        }
        for (first, second) in links {
            self.mates[first as usize] = Some(second);
            self.mates[second as usize] = Some(first);
        }
        Ok(())
    }

    /// Iterate `(id, sequence)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.sequences
            .iter()
            .enumerate()
            .map(|(id, seq)| (id as u32, seq.as_slice()))
    }
}

impl SequenceStore for ReadTable {
    fn get_sequence(&self, id: u32) -> Option<&[u8]> {
        self.sequences.get(id as usize).map(Vec::as_slice)
    }

    fn get_name(&self, id: u32) -> Option<&str> {
        self.seq_index.get_name(id)
    }

    fn get_mate_id(&self, id: u32) -> Option<u32> {
        self.mates.get(id as usize).copied().flatten()
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SequenceFormat {
    Fasta,
    Fastq,
}

fn detect_format(path: &str) -> io::Result<SequenceFormat> {
    let p = Path::new(path);
    let file_name = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let stripped = [".gz", ".bgz"]
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);
    let extension = Path::new(stripped)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    match extension {
        "fa" | "fasta" | "fna" => Ok(SequenceFormat::Fasta),
        "fq" | "fastq" => Ok(SequenceFormat::Fastq),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Unsupported file extension for '{path}'. Expected .fa/.fasta/.fna/.fq/.fastq, optionally BGZF-compressed"),
        )),
    }
}

fn open_reader(path: &str) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to open sequence file '{path}': {e}"))
    })?;
    if [".gz", ".bgz"].iter().any(|e| path.ends_with(e)) {
        Ok(Box::new(BufReader::new(bgzf::io::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn name_to_string(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Records of a sequence file, read one at a time.
pub type SequenceRecords = Box<dyn Iterator<Item = io::Result<SeqRecord>>>;

/// Stream the records of a FASTA or FASTQ file (plain or BGZF).
pub fn sequence_records(path: &str) -> io::Result<SequenceRecords> {
    let format = detect_format(path)?;
    let reader = open_reader(path)?;

    Ok(match format {
        SequenceFormat::Fasta => {
            let mut reader = fasta::io::Reader::new(reader);
            Box::new(std::iter::from_fn(move || {
                reader.records().next().map(|result| {
                    result.map(|record| {
                        SeqRecord::new(name_to_string(record.name()), record.sequence().as_ref().to_vec())
                    })
                })
            }))
        }
        SequenceFormat::Fastq => {
            let mut reader = fastq::io::Reader::new(reader);
            Box::new(std::iter::from_fn(move || {
                reader.records().next().map(|result| {
                    result.map(|record| SeqRecord::new(name_to_string(record.name()), record.sequence().to_vec()))
                })
            }))
        }
    })
}

/// Read every record of a FASTA or FASTQ file (plain or BGZF).
pub fn read_sequence_file(path: &str) -> io::Result<Vec<SeqRecord>> {
    sequence_records(path)?.collect()
}

/// Write records as FASTA, one sequence line per record.
pub fn write_fasta<W: Write>(writer: &mut W, records: &[SeqRecord]) -> io::Result<()> {
    for record in records {
        writeln!(writer, ">{}", record.name)?;
        writer.write_all(&record.sequence)?;
        writeln!(writer)?;
    }
    Ok(())
}
