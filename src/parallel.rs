//! Submodule providing parallel dispatch over contiguous task ranges.
//!
//! With the `parallel` feature enabled (the default), dispatch spawns one
//! scoped OS thread per non-empty range; without it, everything runs serially
//! on the calling thread, which makes runs bit-for-bit deterministic.

use crate::errors::MatrixError;

/// Splits `[0, tasks)` into at most `workers` non-empty contiguous ranges,
/// returned as `(start, length)` pairs.
pub(crate) fn partition(tasks: usize, workers: usize) -> Vec<(usize, usize)> {
    if tasks == 0 || workers == 0 {
        return Vec::new();
    }
    let used = workers.min(tasks);
    let base = tasks / used;
    let extra = tasks % used;
    let mut ranges = Vec::with_capacity(used);
    let mut start = 0;
    for w in 0..used {
        let length = base + usize::from(w < extra);
        ranges.push((start, length));
        start += length;
    }
    ranges
}

/// Runs `func` once per part, concurrently when the `parallel` feature is
/// enabled, and collects the results in part order. The first failure wins;
/// remaining workers still run to completion before it is reported.
pub(crate) fn run_partitioned<T, R, F>(parts: Vec<T>, func: F) -> Result<Vec<R>, MatrixError>
where
    T: Send,
    R: Send,
    F: Fn(usize, T) -> Result<R, MatrixError> + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if parts.len() > 1 {
            let results = std::thread::scope(|scope| {
                let mut handles = Vec::with_capacity(parts.len());
                for (w, part) in parts.into_iter().enumerate() {
                    let func = &func;
                    handles.push(scope.spawn(move || func(w, part)));
                }
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
                    .collect::<Vec<_>>()
            });
            return results.into_iter().collect();
        }
    }

    parts.into_iter().enumerate().map(|(w, part)| func(w, part)).collect()
}

/// Partitions `[0, tasks)` across up to `workers` workers and calls
/// `func(worker, start, length)` once per non-empty range, concurrently when
/// the `parallel` feature is enabled.
///
/// Returns the number of workers actually used, which is zero when there are
/// no tasks and never exceeds `workers`.
///
/// # Errors
///
/// Propagates the first worker failure after all workers have joined.
pub fn parallelize<F>(func: F, tasks: usize, workers: usize) -> Result<usize, MatrixError>
where
    F: Fn(usize, usize, usize) -> Result<(), MatrixError> + Sync,
{
    let ranges = partition(tasks, workers.max(1));
    let used = ranges.len();
    run_partitioned(ranges, |w, (start, length)| func(w, start, length))?;
    Ok(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_partition_covers_everything() {
        for tasks in [0_usize, 1, 7, 64, 65] {
            for workers in [1_usize, 2, 3, 8, 100] {
                let ranges = partition(tasks, workers);
                assert!(ranges.len() <= workers);
                let mut expected = 0;
                for (start, length) in &ranges {
                    assert_eq!(*start, expected, "{tasks} tasks over {workers} workers");
                    assert!(*length > 0);
                    expected += length;
                }
                assert_eq!(expected, tasks);
            }
        }
    }

    #[test]
    fn test_parallelize_visits_all_tasks() {
        let seen = Mutex::new(vec![false; 100]);
        let used = parallelize(
            |_, start, length| {
                let mut seen = seen.lock().unwrap();
                for t in start..start + length {
                    seen[t] = true;
                }
                Ok(())
            },
            100,
            3,
        )
        .unwrap();
        assert_eq!(used, 3);
        assert!(seen.into_inner().unwrap().iter().all(|&x| x));
    }

    #[test]
    fn test_parallelize_caps_workers() {
        let used = parallelize(|_, _, _| Ok(()), 2, 8).unwrap();
        assert_eq!(used, 2);
        let used = parallelize(|_, _, _| Ok(()), 0, 8).unwrap();
        assert_eq!(used, 0);
    }

    #[test]
    fn test_parallelize_propagates_first_failure() {
        let result = parallelize(
            |w, _, _| {
                if w > 0 {
                    Err(MatrixError::Domain(format!("worker {w}")))
                } else {
                    Ok(())
                }
            },
            10,
            4,
        );
        match result {
            Err(MatrixError::Domain(message)) => assert_eq!(message, "worker 1"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
