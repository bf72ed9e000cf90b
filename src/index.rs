use crate::fm_index::FmIndex;
use crate::interval_cache::IntervalCache;
use crate::sampled_sa::SampledSuffixArray;
use crate::sequence_store::{ReadTable, SequenceStore};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_SAMPLE_RATE: usize = 32;
pub const DEFAULT_CACHE_LEN: usize = 8;

/// The read-only structures every query needs, built and stored together.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSet {
    pub fm: FmIndex,
    pub ssa: SampledSuffixArray,
    pub cache: IntervalCache,
}

impl IndexSet {
    pub fn build(table: &ReadTable, sample_rate: usize, cache_len: usize) -> io::Result<Self> {
        let start = Instant::now();
        let sequences: Vec<&[u8]> = table.iter().map(|(_, seq)| seq).collect();
        let lengths: Vec<usize> = sequences.iter().map(|s| s.len()).collect();

        let (fm, suffix_array) = FmIndex::build(&sequences)?;
        let ssa = SampledSuffixArray::build(&suffix_array, &lengths, sample_rate);
        drop(suffix_array);
        let cache = IntervalCache::build(&fm, cache_len);

        info!(
            "Indexed {} sequences ({} symbols) in {:.2?}",
            table.len(),
            lengths.iter().map(|l| l + 1).sum::<usize>(),
            start.elapsed()
        );
        Ok(IndexSet { fm, ssa, cache })
    }

    pub fn save(&self, index_file: &str) -> io::Result<()> {
        let file = File::create(index_file)?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| io::Error::other(format!("Failed to serialize index: {e:?}")))?;
        Ok(())
    }

    pub fn load(index_file: &str) -> io::Result<Self> {
        let file = File::open(index_file)?;
        let mut reader = BufReader::new(file);
        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to deserialize index '{index_file}': {e:?}"),
            )
        })
    }
}

pub fn index_path(sequence_file: &str) -> String {
    format!("{sequence_file}.fmi")
}

/// Load `<sequence_file>.fmi` if present, otherwise build and save it.
pub fn load_or_build_index(
    sequence_file: &str,
    table: &ReadTable,
    sample_rate: usize,
    cache_len: usize,
    force_reindex: bool,
) -> io::Result<IndexSet> {
    let index_file = index_path(sequence_file);
    if !force_reindex && Path::new(&index_file).exists() {
        warn_if_stale(sequence_file, &index_file);
        let start = Instant::now();
        let index = IndexSet::load(&index_file)?;
        if index.ssa.num_sequences() != table.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Index '{}' covers {} sequences but '{}' has {}; rebuild with --force-reindex",
                    index_file,
                    index.ssa.num_sequences(),
                    sequence_file,
                    table.len()
                ),
            ));
        }
        info!("Loaded index '{}' in {:.2?}", index_file, start.elapsed());
        return Ok(index);
    }

    let index = IndexSet::build(table, sample_rate, cache_len)?;
    index.save(&index_file)?;
    info!("Wrote index '{index_file}'");
    Ok(index)
}

fn warn_if_stale(sequence_file: &str, index_file: &str) {
    let modified = |path: &str| std::fs::metadata(path).and_then(|m| m.modified());
    match (modified(sequence_file), modified(index_file)) {
        (Ok(seq_ts), Ok(index_ts)) => {
            if seq_ts > index_ts {
                warn!("Sequence file '{sequence_file}' has been modified since index creation.");
            }
        }
        _ => warn!("Unable to compare timestamps of '{sequence_file}' and its index. The index may be stale."),
    }
}
