//! Bounded worker pool.
//!
//! Items go into one shared queue; a fixed group of workers pulls from it
//! until it is empty. Results land in a slot per item, so the output order
//! matches the input order whatever the completion order was.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::warn;

/// Runs `work` on every item with at most `workers` running at once.
///
/// Slot `i` holds the result for item `i`, or `None` if the worker running it
/// panicked.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, work: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total: usize = items.len();
    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    if total == 0 {
        return slots;
    }

    let queue: Arc<Mutex<VecDeque<(usize, T)>>> = Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let work: Arc<F> = Arc::new(work);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, R)>();

    let handles: Vec<_> = (0..workers.clamp(1, total))
        .map(|_| {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    let next: Option<(usize, T)> = queue.lock().ok().and_then(|mut queue| queue.pop_front());
                    let Some((index, item)) = next else {
                        break;
                    };
                    let result: R = work(item).await;
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(tx);

    while let Some((index, result)) = rx.recv().await {
        slots[index] = Some(result);
    }
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Worker stopped early: {e}");
        }
    }

    slots
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_the_worker_count() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (running_ref, peak_ref) = (Arc::clone(&running), Arc::clone(&peak));

        let results = run_bounded((0..100).collect(), 3, move |n: usize| {
            let running = Arc::clone(&running_ref);
            let peak = Arc::clone(&peak_ref);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                n * 2
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(results.len(), 100);
        for (i, slot) in results.iter().enumerate() {
            assert_eq!(*slot, Some(i * 2));
        }
    }

    #[tokio::test]
    async fn every_item_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_ref = Arc::clone(&calls);
        let results = run_bounded((0..56).collect::<Vec<u32>>(), 10, move |n| {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            async move { n }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 56);
        assert!(results.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn empty_input_yields_no_slots() {
        let results: Vec<Option<u8>> = run_bounded(Vec::<u8>::new(), 4, |n| async move { n }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_workers_still_makes_progress() {
        let results = run_bounded(vec![1, 2, 3], 0, |n: i32| async move { n + 1 }).await;
        assert_eq!(results, vec![Some(2), Some(3), Some(4)]);
    }

    #[tokio::test]
    async fn panicking_item_leaves_an_empty_slot() {
        let results = run_bounded(vec![1, 2, 3, 4], 2, |n: i32| async move {
            if n == 3 {
                panic!("boom");
            }
            n
        })
        .await;

        assert_eq!(results[2], None);
        assert_eq!(results.iter().flatten().count(), 3);
    }
}
