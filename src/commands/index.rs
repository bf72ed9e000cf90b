use crate::index::{load_or_build_index, IndexSet};
use crate::sequence_store::{ReadTable, SequenceStore};
use log::info;
use std::io;

/// Load a sequence file together with its FM-index, building the index when needed.
pub fn load_indexed_sequences(
    sequence_file: &str,
    sample_rate: usize,
    cache_len: usize,
    force_reindex: bool,
) -> io::Result<(ReadTable, IndexSet)> {
    let table = ReadTable::from_files(&[sequence_file.to_string()])?;
    if table.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("No sequences found in '{sequence_file}'"),
        ));
    }
    let index = load_or_build_index(sequence_file, &table, sample_rate, cache_len, force_reindex)?;
    Ok((table, index))
}

/// Build (or rebuild) `<input>.fmi`
pub fn run_index(input: &str, sample_rate: usize, cache_len: usize, force_reindex: bool) -> io::Result<()> {
    info!("Running index command on '{input}'");
    let (table, index) = load_indexed_sequences(input, sample_rate, cache_len, force_reindex)?;
    info!(
        "Index ready: {} sequences, sample rate {}, cache length {}",
        table.len(),
        index.ssa.sample_rate(),
        index.cache.cache_len()
    );
    Ok(())
}
