use crate::connect::{pair_records, ConnectPostProcess, ConnectProcess};
use crate::overlap::SuffixPrefixOracle;
use crate::parallel::{process_parallel, HarnessConfig};
use crate::sequence_store::sequence_records;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Write};

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub mate1: String,
    /// Second mate file; `mate1` is read as interleaved pairs when absent
    pub mate2: Option<String>,
    pub min_overlap: usize,
    pub error_rate: f64,
    pub batch_size: usize,
    pub num_threads: usize,
    pub output: Option<String>,
}

/// Resolve the gap of every read pair and stream one record per pair.
pub fn run_connect(options: &ConnectOptions) -> io::Result<()> {
    if options.min_overlap == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Minimum overlap must be greater than 0",
        ));
    }
    if !(0.0..1.0).contains(&options.error_rate) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Error rate must be in [0, 1), got {}", options.error_rate),
        ));
    }

    let mate1 = sequence_records(&options.mate1)?;
    let mate2 = match &options.mate2 {
        Some(path) => Some(sequence_records(path)?),
        None => None,
    };
    info!("Connecting read pairs on {} threads", options.num_threads);

    let writer: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to create output file '{path}': {e}"))
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let oracle = SuffixPrefixOracle::new(options.error_rate);
    let processor = ConnectProcess::new(&oracle, options.min_overlap);
    let mut sink = ConnectPostProcess::new(writer, processor.min_overlap())?;
    let config = HarnessConfig {
        num_threads: options.num_threads,
        batch_size: options.batch_size,
    };
    // Pairs stream into the harness; the first read error stops the input
    let mut read_error = None;
    let pairs = pair_records(mate1, mate2).map_while(|pair| match pair {
        Ok(pair) => Some(pair),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });
    let num_pairs = process_parallel(pairs, &processor, &mut sink, config)?;
    if let Some(e) = read_error {
        return Err(e);
    }
    sink.finish()?;
    info!("Processed {num_pairs} read pairs");
    Ok(())
}
