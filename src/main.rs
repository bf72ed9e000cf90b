use clap::Parser;
use hapconnect::commands::connect::{run_connect, ConnectOptions};
use hapconnect::commands::index::run_index;
use hapconnect::commands::place::{run_place, PlaceOptions};
use hapconnect::commands::recruit::run_recruit;
use hapconnect::index::{DEFAULT_CACHE_LEN, DEFAULT_SAMPLE_RATE};
use hapconnect::placement::PlacementParams;
use hapconnect::recruit::RecruitParams;
use log::info;
use rayon::ThreadPoolBuilder;
use std::io;
use std::num::NonZeroUsize;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(4).unwrap())]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Options controlling the FM-index stored next to a sequence file
#[derive(Parser, Debug)]
struct IndexOpts {
    /// Suffix array sampling rate; larger values give a smaller index and slower position lookups.
    #[clap(short = 's', long, value_parser, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: usize,

    /// Length of the k-mers whose suffix array intervals are precomputed.
    #[clap(short = 'c', long, value_parser, default_value_t = DEFAULT_CACHE_LEN)]
    cache_length: usize,

    /// Force the regeneration of the index, even if it already exists.
    #[clap(short = 'I', long, action)]
    force_reindex: bool,
}

/// Haplotype placement, read recruitment and read-pair gap resolution.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Build the FM-index of a FASTA/FASTQ file
    Index {
        #[clap(flatten)]
        common: CommonOpts,

        /// Sequence file to index (the index is written to <input>.fmi)
        #[clap(short = 'i', long, value_parser)]
        input: String,

        #[clap(flatten)]
        index: IndexOpts,
    },
    /// Place haplotypes on a reference
    Place {
        #[clap(flatten)]
        common: CommonOpts,

        /// Reference FASTA file
        #[clap(short = 'r', long, value_parser)]
        reference: String,

        /// FASTA/FASTQ file with the haplotypes to place
        #[clap(short = 'q', long, value_parser)]
        haplotypes: String,

        #[clap(flatten)]
        index: IndexOpts,

        /// Length of the exact seeds looked up in the reference index
        #[clap(long, value_parser, default_value_t = 21)]
        seed_length: usize,

        /// Maximum edits per haplotype base for a placement to be reported
        #[clap(long, value_parser, default_value_t = 0.05)]
        max_edit_rate: f64,

        /// Seeds with more reference hits than this are skipped
        #[clap(long, value_parser, default_value_t = 256)]
        max_seed_hits: usize,

        /// Merge placements separated by at most this many bases
        #[clap(long, value_parser, default_value_t = 0)]
        coalesce_gap: usize,

        /// Only search the forward strand
        #[clap(long, action)]
        forward_only: bool,

        /// Reference bases added on each side when building flanking haplotypes (0 to disable)
        #[clap(short = 'f', long, value_parser, default_value_t = 0)]
        flanking: usize,

        /// Write flanking haplotypes to this FASTA file
        #[clap(long, value_parser)]
        flanking_out: Option<String>,

        /// Render every placement against the reference at debug level
        #[clap(long, action)]
        print_alignments: bool,
    },
    /// Recruit reads that share k-mers with haplotypes
    Recruit {
        #[clap(flatten)]
        common: CommonOpts,

        /// Read file to recruit from
        #[clap(short = 'r', long, value_parser)]
        reads: String,

        /// FASTA/FASTQ file with the haplotypes
        #[clap(short = 'q', long, value_parser)]
        haplotypes: String,

        #[clap(flatten)]
        index: IndexOpts,

        /// k-mer length
        #[clap(short = 'k', long, value_parser, default_value_t = 31)]
        k: usize,

        /// Also look up the reverse complement of every haplotype
        #[clap(long, action)]
        reverse: bool,

        /// k-mers occurring more often than this in the reads are ignored
        #[clap(long, value_parser, default_value_t = 1000)]
        max_kmer_occurrences: usize,

        /// Output prefix; writes <prefix>.reads.fa and <prefix>.mates.fa
        #[clap(short = 'o', long, value_parser)]
        output_prefix: String,
    },
    /// Resolve the sequence between the mates of each read pair
    Connect {
        #[clap(flatten)]
        common: CommonOpts,

        /// First mate file, or interleaved pairs when --mate2 is not given
        #[clap(short = '1', long, value_parser)]
        mate1: String,

        /// Second mate file
        #[clap(short = '2', long, value_parser)]
        mate2: Option<String>,

        /// Minimum overlap between the mates
        #[clap(short = 'm', long, value_parser, default_value_t = 45)]
        min_overlap: usize,

        /// Maximum fraction of mismatches inside the overlap
        #[clap(short = 'e', long, value_parser, default_value_t = 0.0)]
        error_rate: f64,

        /// Pairs handed to each worker thread at a time
        #[clap(long, value_parser, default_value_t = 1000)]
        batch_size: usize,

        /// Output file (default: stdout)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Index {
            common,
            input,
            index,
        } => {
            initialize(&common)?;
            run_index(&input, index.sample_rate, index.cache_length, index.force_reindex)?;
        }
        Args::Place {
            common,
            reference,
            haplotypes,
            index,
            seed_length,
            max_edit_rate,
            max_seed_hits,
            coalesce_gap,
            forward_only,
            flanking,
            flanking_out,
            print_alignments,
        } => {
            initialize(&common)?;
            let options = PlaceOptions {
                reference,
                haplotypes,
                params: PlacementParams {
                    seed_length,
                    max_edit_rate,
                    max_seed_hits,
                    coalesce_gap,
                    both_strands: !forward_only,
                },
                flanking,
                flanking_out,
                print_alignments,
                sample_rate: index.sample_rate,
                cache_len: index.cache_length,
                force_reindex: index.force_reindex,
            };
            run_place(&options)?;
        }
        Args::Recruit {
            common,
            reads,
            haplotypes,
            index,
            k,
            reverse,
            max_kmer_occurrences,
            output_prefix,
        } => {
            initialize(&common)?;
            let params = RecruitParams {
                k,
                do_reverse: reverse,
                max_kmer_occurrences,
            };
            run_recruit(
                &reads,
                &haplotypes,
                &output_prefix,
                &params,
                index.sample_rate,
                index.cache_length,
                index.force_reindex,
            )?;
        }
        Args::Connect {
            common,
            mate1,
            mate2,
            min_overlap,
            error_rate,
            batch_size,
            output,
        } => {
            initialize(&common)?;
            let options = ConnectOptions {
                mate1,
                mate2,
                min_overlap,
                error_rate,
                batch_size,
                num_threads: common.num_threads.get(),
                output,
            };
            run_connect(&options)?;
        }
    }

    Ok(())
}

/// Initialize logger and the global thread pool
fn initialize(common: &CommonOpts) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    ThreadPoolBuilder::new()
        .num_threads(common.num_threads.into())
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {e}")))?;

    info!("Using {} threads", common.num_threads);
    Ok(())
}
