#![forbid(unsafe_code)]

//! A fixed pool of OS worker threads running a data-parallel map.
//!
//! Workers pull the next unclaimed input index from a shared counter, so a
//! slow item never stalls the queue behind it. Outputs are collected as
//! `(index, value)` pairs and scattered into a pre-sized buffer, making the
//! returned order equal to the input order regardless of scheduling.
//!
//! Compilation and chunk compression both run on this: every input is
//! independent and every output targets a distinct slot, so the only shared
//! mutable state is the claim counter and the collection vector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Number of hardware threads, falling back to 1 when unknown.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Maps `f` over `items` on up to `workers` threads, returning outputs in
/// input order.
///
/// `workers` is clamped to `items.len()` and to at least 1. Panics in `f`
/// propagate to the caller once all workers have stopped.
pub fn map_indexed<T, U, F>(items: &[T], workers: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, items.len());

    let next = AtomicUsize::new(0);
    let collected: Mutex<Vec<(usize, U)>> = Mutex::new(Vec::with_capacity(items.len()));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                let output = f(item);
                collected
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((index, output));
            });
        }
    });

    let mut collected = collected
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    debug_assert_eq!(collected.len(), items.len());
    collected.sort_unstable_by_key(|(index, _)| *index);
    collected.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_preserve_input_order() {
        let items: Vec<u32> = (0..257).collect();
        let doubled = map_indexed(&items, 8, |&n| n * 2);
        assert_eq!(doubled, items.iter().map(|n| n * 2).collect::<Vec<u32>>());
    }

    #[test]
    fn empty_input_spawns_nothing() {
        let out: Vec<u32> = map_indexed(&[] as &[u32], 8, |&n| n);
        assert!(out.is_empty());
    }

    #[test]
    fn single_worker_is_sequential() {
        let items = vec![3u64, 1, 4, 1, 5];
        let out = map_indexed(&items, 1, |&n| n + 1);
        assert_eq!(out, vec![4, 2, 5, 2, 6]);
    }

    #[test]
    fn every_item_is_processed_exactly_once() {
        let calls = AtomicUsize::new(0);
        let items: Vec<usize> = (0..100).collect();
        let out = map_indexed(&items, 16, |&n| {
            calls.fetch_add(1, Ordering::Relaxed);
            n
        });
        assert_eq!(calls.load(Ordering::Relaxed), items.len());
        assert_eq!(out.iter().copied().collect::<HashSet<_>>().len(), items.len());
    }

    #[test]
    fn default_parallelism_is_positive() {
        assert!(default_parallelism() >= 1);
    }
}
