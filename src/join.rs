//! Join Module
//!
//! Structured "launch N independent operations, join all, fail on first
//! failure" primitives used by the compound document operations.
//!
//! Every task runs on its own scoped thread and every task is joined before
//! the call returns: there is no cancellation, so a failure in one task never
//! stops the others. "First failure" means first in completion order.

use crossbeam::channel;

use crate::error::{Result, StashError};

/// Outcome of a [`join_all`] call
#[derive(Debug)]
pub struct Joined<T> {
    /// One result per task, in submission order
    results: Vec<Result<T>>,

    /// Indexes of failed tasks, in completion order
    failure_order: Vec<usize>,
}

impl<T> Joined<T> {
    /// True when every task succeeded
    pub fn is_ok(&self) -> bool {
        self.failure_order.is_empty()
    }

    /// Index of the task whose failure completed first
    pub fn first_failure(&self) -> Option<usize> {
        self.failure_order.first().copied()
    }

    /// Per-task results in submission order
    pub fn results(&self) -> &[Result<T>] {
        &self.results
    }

    /// All values, or the failure that completed first
    pub fn into_result(self) -> Result<Vec<T>> {
        let first = self.first_failure();
        let mut values = Vec::with_capacity(self.results.len());
        let mut first_error = None;

        for (index, result) in self.results.into_iter().enumerate() {
            match result {
                Ok(value) => values.push(value),
                Err(e) if Some(index) == first => first_error = Some(e),
                Err(_) => {}
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(values),
        }
    }

    /// Per-task results plus the completion order of failures
    pub fn into_parts(self) -> (Vec<Result<T>>, Vec<usize>) {
        (self.results, self.failure_order)
    }
}

/// Run every task concurrently and wait for all of them
pub fn join_all<'env, T, F>(tasks: Vec<F>) -> Joined<T>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send + 'env,
{
    let count = tasks.len();
    let (tx, rx) = channel::unbounded::<(usize, Result<T>)>();

    let scoped = crossbeam::thread::scope(|scope| {
        for (index, task) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                // The receiver outlives the scope, so this cannot fail
                let _ = tx.send((index, task()));
            });
        }
    });
    drop(tx);

    if let Err(panic) = scoped {
        std::panic::resume_unwind(panic);
    }

    let mut slots: Vec<Option<Result<T>>> = (0..count).map(|_| None).collect();
    let mut failure_order = Vec::new();
    // Channel order is completion order
    for (index, result) in rx.iter() {
        if result.is_err() {
            failure_order.push(index);
        }
        slots[index] = Some(result);
    }

    let results = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(StashError::Store("task produced no result".to_string()))))
        .collect();

    Joined {
        results,
        failure_order,
    }
}

/// Run two tasks of different result types concurrently; fail with the first failure
pub fn try_join2<'env, A, B, FA, FB>(first: FA, second: FB) -> Result<(A, B)>
where
    A: Send,
    B: Send,
    FA: FnOnce() -> Result<A> + Send + 'env,
    FB: FnOnce() -> Result<B> + Send + 'env,
{
    let (tx, rx) = channel::unbounded::<StashError>();

    let scoped = crossbeam::thread::scope(|scope| {
        let tx_first = tx.clone();
        let handle_first = scope.spawn(move |_| {
            first().map_err(|e| {
                let _ = tx_first.send(e);
            })
        });

        let tx_second = tx.clone();
        let handle_second = scope.spawn(move |_| {
            second().map_err(|e| {
                let _ = tx_second.send(e);
            })
        });

        (handle_first.join(), handle_second.join())
    });
    drop(tx);

    let (joined_first, joined_second) = match scoped {
        Ok(handles) => handles,
        Err(panic) => std::panic::resume_unwind(panic),
    };
    let first_value = joined_first.unwrap_or_else(|panic| std::panic::resume_unwind(panic));
    let second_value = joined_second.unwrap_or_else(|panic| std::panic::resume_unwind(panic));

    match (first_value, second_value) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        _ => Err(rx
            .try_recv()
            .unwrap_or_else(|_| StashError::Store("joined task failed without an error".to_string()))),
    }
}
