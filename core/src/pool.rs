//! Fixed-size worker pool draining a bounded queue of work-item indices.

use crossbeam_channel::bounded;
use std::sync::OnceLock;
use std::thread;

const QUEUE_CAPACITY: usize = 200;

/// Number of workers to use when the caller has no preference.
pub fn default_workers() -> usize { thread::available_parallelism().map(|n| n.get()).unwrap_or(1) }

/// Run `job(i)` for every `i` in `0..len` on `workers` threads and return the results in index order.
///
/// A single producer feeds the indices through a bounded queue; each result lands in its own
/// pre-sized slot, so workers never contend on a shared collection. Returns once every worker
/// has drained the queue and joined.
pub fn run_indexed<T, F>(len: usize, workers: usize, job: F) -> Vec<T>
where
    T: Send + Sync,
    F: Fn(usize) -> T + Sync,
{
    let slots: Vec<OnceLock<T>> = (0..len).map(|_| OnceLock::new()).collect();
    let (tx, rx) = bounded::<usize>(QUEUE_CAPACITY);

    thread::scope(|scope| {
        for _ in 0..workers.clamp(1, len.max(1)) {
            let rx = rx.clone();
            let slots = &slots;
            let job = &job;
            scope.spawn(move || {
                for i in rx.iter() {
                    let _ = slots[i].set(job(i));
                }
            });
        }
        drop(rx);
        for i in 0..len {
            if tx.send(i).is_err() {
                break;
            }
        }
        drop(tx);
    });

    let results: Vec<T> = slots.into_iter().filter_map(OnceLock::into_inner).collect();
    debug_assert_eq!(results.len(), len, "a worker left its slot empty");
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_come_back_in_index_order() {
        let squares = run_indexed(1000, 4, |i| i * i);
        assert_eq!(squares.len(), 1000);
        assert!(squares.iter().enumerate().all(|(i, &s)| s == i * i));
    }

    #[test]
    fn handles_degenerate_sizes() {
        assert!(run_indexed(0, 8, |i| i).is_empty());
        assert_eq!(run_indexed(3, 0, |i| i + 1), vec![1, 2, 3]);
    }
}
