//! Stage runner: bounded-concurrency execution of independent per-item work.
//!
//! A fixed pool of `concurrency` workers pulls item indices from a shared atomic cursor.
//! Each finished item lands in the slot matching its input position, so output order equals
//! input order whatever the completion order. The only shared mutable state is the cursor
//! and the completion counter, both atomics.
//!
//! Once the run deadline has passed no worker claims a new index. Work already in flight
//! finishes its current call; indices never claimed are reported as undispatched.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::progress::{ProgressKind, ProgressReporter};
use super::{Keyed, Stage, StageFailure, StageResult};

#[derive(Debug, Clone)]
pub struct StageRunner {
    concurrency: usize,
    deadline: Option<Instant>,
    progress: ProgressReporter,
}

impl StageRunner {
    pub fn new(concurrency: usize, deadline: Option<Instant>, progress: ProgressReporter) -> Self {
        Self {
            concurrency: concurrency.max(1),
            deadline,
            progress,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Runs `op` over every input with at most `concurrency` units in flight.
    ///
    /// Returns one slot per input, in input order. `None` marks an input that was never
    /// dispatched because the deadline expired first.
    pub async fn run_units<'a, I, R, F, Fut>(
        &self,
        stage: Stage,
        inputs: &'a [I],
        op: F,
    ) -> Vec<Option<R>>
    where
        F: Fn(&'a I) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = inputs.len();
        let cursor = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let workers = self.concurrency.min(total);

        let cursor = &cursor;
        let completed = &completed;
        let op = &op;

        let worker = move |worker_id: usize| async move {
            let mut finished = Vec::new();
            loop {
                if self.deadline_passed() {
                    debug!("[{stage}] worker {worker_id} stops: deadline passed");
                    break;
                }
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                if index >= total {
                    break;
                }
                let output = op(&inputs[index]).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                self.progress
                    .emit(ProgressKind::ItemCompleted, stage, done, total);
                finished.push((index, output));
            }
            finished
        };

        let per_worker = join_all((0..workers).map(worker)).await;

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        for (index, output) in per_worker.into_iter().flatten() {
            slots[index] = Some(output);
        }

        let undispatched = slots.iter().filter(|s| s.is_none()).count();
        if undispatched > 0 {
            warn!("[{stage}] {undispatched}/{total} item(s) not dispatched before the run deadline");
        }
        self.progress.emit(
            ProgressKind::StageFinished,
            stage,
            completed.load(Ordering::Relaxed),
            total,
        );

        slots
    }

    /// Per-candidate stage: wraps every slot in a `StageResult` keyed by the input's id.
    /// Undispatched inputs become `StageFailure::Timeout`.
    pub async fn run<'a, I, T, F, Fut>(
        &self,
        stage: Stage,
        inputs: &'a [I],
        op: F,
    ) -> Vec<StageResult<T>>
    where
        I: Keyed,
        F: Fn(&'a I) -> Fut,
        Fut: Future<Output = Result<T, StageFailure>>,
    {
        let slots = self.run_units(stage, inputs, op).await;

        inputs
            .iter()
            .zip(slots)
            .map(|(input, slot)| {
                let id = input.candidate_id();
                match slot {
                    Some(result) => StageResult::from_result(id, result),
                    None => StageResult::failure(id, StageFailure::Timeout),
                }
            })
            .collect()
    }
}
