//! Parallel per-item processing with in-order post-processing.
//!
//! Input is consumed in chunks. Each chunk is split into contiguous batches,
//! one per worker thread, and every worker runs its own clone of the
//! processor. Results travel back tagged with their input index and are held
//! in a reorder buffer until all of their predecessors have been handed to
//! the post-processor, so output order always equals input order.

use log::debug;
use std::collections::BTreeMap;
use std::io;
use std::sync::mpsc;

/// Per-item work done on a worker thread.
pub trait SequenceProcessor: Send + Clone {
    type Item: Sync;
    type Output: Send;

    fn process(&mut self, item: &Self::Item) -> Self::Output;
}

/// Single-threaded consumer of `(item, output)` pairs in input order.
pub trait PostProcessor<I, O> {
    fn post_process(&mut self, item: &I, output: O) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct HarnessConfig {
    pub num_threads: usize,
    /// Items per worker per chunk
    pub batch_size: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            batch_size: 1000,
        }
    }
}

/// Run `processor` over `items` on `config.num_threads` workers and feed the
/// results to `sink` in input order. Returns the number of items processed.
pub fn process_parallel<P, S, It>(
    items: It,
    processor: &P,
    sink: &mut S,
    config: HarnessConfig,
) -> io::Result<usize>
where
    P: SequenceProcessor,
    S: PostProcessor<P::Item, P::Output>,
    It: IntoIterator<Item = P::Item>,
{
    let num_threads = config.num_threads.max(1);
    let chunk_len = num_threads * config.batch_size.max(1);
    let mut items = items.into_iter();
    let mut total = 0;

    loop {
        let chunk: Vec<P::Item> = items.by_ref().take(chunk_len).collect();
        if chunk.is_empty() {
            break;
        }
        process_chunk(&chunk, processor, sink, num_threads)?;
        total += chunk.len();
        debug!("Processed {total} items");
    }

    Ok(total)
}

fn process_chunk<P, S>(chunk: &[P::Item], processor: &P, sink: &mut S, num_threads: usize) -> io::Result<()>
where
    P: SequenceProcessor,
    S: PostProcessor<P::Item, P::Output>,
{
    let per_worker = chunk.len().div_ceil(num_threads);
    let (tx, rx) = mpsc::sync_channel::<(usize, P::Output)>(per_worker.max(1));

    std::thread::scope(|scope| {
        for (batch_idx, batch) in chunk.chunks(per_worker).enumerate() {
            let tx = tx.clone();
            let mut worker = processor.clone();
            let first = batch_idx * per_worker;
            scope.spawn(move || {
                for (offset, item) in batch.iter().enumerate() {
                    let output = worker.process(item);
                    // The receiver only hangs up when the sink failed
                    if tx.send((first + offset, output)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut pending: BTreeMap<usize, P::Output> = BTreeMap::new();
        let mut next = 0;
        for (idx, output) in rx {
            pending.insert(idx, output);
            while let Some(output) = pending.remove(&next) {
                sink.post_process(&chunk[next], output)?;
                next += 1;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[derive(Clone)]
    struct Square;

    impl SequenceProcessor for Square {
        type Item = u64;
        type Output = u64;

        fn process(&mut self, item: &u64) -> u64 {
            // later items finish first to scramble completion order
            thread::sleep(Duration::from_micros(200 * (10 - item % 10)));
            item * item
        }
    }

    #[derive(Default)]
    struct Collect(Vec<(u64, u64)>);

    impl PostProcessor<u64, u64> for Collect {
        fn post_process(&mut self, item: &u64, output: u64) -> io::Result<()> {
            self.0.push((*item, output));
            Ok(())
        }
    }

    struct FailAt(u64);

    impl PostProcessor<u64, u64> for FailAt {
        fn post_process(&mut self, item: &u64, _output: u64) -> io::Result<()> {
            if *item == self.0 {
                return Err(io::Error::other("sink failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_output_order_matches_input_order() {
        for (num_threads, batch_size) in [(1, 5), (3, 4), (8, 1), (4, 100)] {
            let mut sink = Collect::default();
            let config = HarnessConfig {
                num_threads,
                batch_size,
            };
            let count = process_parallel(0..57u64, &Square, &mut sink, config).unwrap();
            assert_eq!(count, 57);
            let expected: Vec<(u64, u64)> = (0..57).map(|i| (i, i * i)).collect();
            assert_eq!(sink.0, expected);
        }
    }

    #[test]
    fn test_empty_input() {
        let mut sink = Collect::default();
        let count = process_parallel(Vec::<u64>::new(), &Square, &mut sink, HarnessConfig::default()).unwrap();
        assert_eq!(count, 0);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_sink_error_stops_processing() {
        let config = HarnessConfig {
            num_threads: 2,
            batch_size: 3,
        };
        let err = process_parallel(0..20u64, &Square, &mut FailAt(4), config).unwrap_err();
        assert_eq!(err.to_string(), "sink failed");
    }
}
