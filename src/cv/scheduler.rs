//! Fold scheduling.
//!
//! A scheduler runs `f(0..n_folds)` and returns results indexed by fold,
//! whatever order the folds actually finish in.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use super::config::Execution;

/// Runs one unit of work per fold and joins them in fold order.
pub trait FoldScheduler: Send + Sync {
    fn run<T, F>(&self, n_folds: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    fn is_parallel(&self) -> bool;
}

/// Runs folds one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler;

impl FoldScheduler for SequentialScheduler {
    fn run<T, F>(&self, n_folds: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        (0..n_folds).map(f).collect()
    }

    fn is_parallel(&self) -> bool {
        false
    }
}

/// Runs folds as rayon tasks.
#[derive(Debug)]
pub struct ThreadPoolScheduler {
    /// `None` uses the global pool.
    pool: Option<ThreadPool>,
}

impl ThreadPoolScheduler {
    /// Thread count semantics:
    /// - `0` = global rayon pool
    /// - `n > 0` = dedicated pool with exactly `n` threads
    pub fn new(n_threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = match n_threads {
            0 => None,
            n => Some(ThreadPoolBuilder::new().num_threads(n).build()?),
        };
        Ok(Self { pool })
    }

    pub fn n_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl FoldScheduler for ThreadPoolScheduler {
    fn run<T, F>(&self, n_folds: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        // Indexed collect keeps fold i at position i.
        let run = || -> Vec<T> { (0..n_folds).into_par_iter().map(&f).collect() };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn is_parallel(&self) -> bool {
        true
    }
}

/// Scheduler selected from [`Execution`].
#[derive(Debug)]
pub enum Scheduler {
    Sequential(SequentialScheduler),
    Pool(ThreadPoolScheduler),
}

impl Scheduler {
    pub fn from_execution(execution: Execution) -> Result<Self, ThreadPoolBuildError> {
        Ok(match execution {
            Execution::Parallel { n_threads } if execution.is_parallel() => {
                Scheduler::Pool(ThreadPoolScheduler::new(n_threads)?)
            }
            _ => Scheduler::Sequential(SequentialScheduler),
        })
    }
}

impl FoldScheduler for Scheduler {
    fn run<T, F>(&self, n_folds: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            Scheduler::Sequential(s) => s.run(n_folds, f),
            Scheduler::Pool(s) => s.run(n_folds, f),
        }
    }

    fn is_parallel(&self) -> bool {
        matches!(self, Scheduler::Pool(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sequential_runs_in_order() {
        let order = Mutex::new(Vec::new());
        let out = SequentialScheduler.run(4, |i| {
            order.lock().unwrap().push(i);
            i * 10
        });
        assert_eq!(out, vec![0, 10, 20, 30]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pool_keeps_fold_order() {
        let scheduler = ThreadPoolScheduler::new(3).unwrap();
        assert_eq!(scheduler.n_threads(), 3);
        let out = scheduler.run(8, |i| {
            // Later folds finish first.
            std::thread::sleep(std::time::Duration::from_millis((8 - i as u64) * 2));
            i
        });
        assert_eq!(out, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_execution() {
        let s = Scheduler::from_execution(Execution::Parallel { n_threads: 1 }).unwrap();
        assert!(!s.is_parallel());
        let s = Scheduler::from_execution(Execution::Parallel { n_threads: 2 }).unwrap();
        assert!(s.is_parallel());
        let s = Scheduler::from_execution(Execution::Sequential).unwrap();
        assert!(!s.is_parallel());
    }
}
