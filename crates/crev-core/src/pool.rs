//! Bounded worker pool for independent per-item work.
//!
//! Items never share a read/write set, so workers need no coordination beyond
//! a shared work index. Cancellation is observed before an item is taken:
//! in-flight items always finish, untaken items come back as `None`.

use crate::report::{BatchReport, ItemOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Run `f` over `items` on at most `workers` threads.
/// Results keep input order; `None` marks an item skipped by cancellation.
pub fn run_bounded<T, R, F>(
    items: &[T],
    workers: usize,
    cancel: &CancellationToken,
    f: F,
) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));

    if workers == 1 {
        return items
            .iter()
            .map(|item| {
                if cancel.is_cancelled() {
                    None
                } else {
                    Some(f(item))
                }
            })
            .collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new((0..items.len()).map(|_| None).collect());

    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                if cancel.is_cancelled() {
                    break;
                }
                let i = next.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(i) else {
                    break;
                };
                let result = f(item);
                slots.lock().unwrap_or_else(PoisonError::into_inner)[i] = Some(result);
            });
        }
    });

    slots.into_inner().unwrap_or_else(PoisonError::into_inner)
}

/// [`run_bounded`] specialised to outcome reports.
pub fn run_batch<T, K, F>(
    items: &[T],
    key: K,
    workers: usize,
    cancel: &CancellationToken,
    f: F,
) -> BatchReport
where
    T: Sync,
    K: Fn(&T) -> String,
    F: Fn(&T) -> ItemOutcome + Sync,
{
    let results = run_bounded(items, workers, cancel, f);
    let items = items
        .iter()
        .zip(results)
        .map(|(item, r)| r.unwrap_or_else(|| ItemOutcome::cancelled(key(item))))
        .collect();
    BatchReport { items }
}
