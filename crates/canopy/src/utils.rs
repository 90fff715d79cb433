//! Common utilities used across the crate.
//!
//! Parallelism configuration for the per-attribute split search and the
//! thread pool setup that backs it.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Passed down from [`TreeBuilder`](crate::training::TreeBuilder) into the
/// split search. When `Parallel`, attribute candidates at a node are scored
/// on the rayon pool; when `Sequential`, they are scored in order on the
/// calling thread. Both produce identical trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over `iter`, in parallel when allowed.
    ///
    /// Output order always matches input order, so a sequential reduction
    /// over the result is deterministic.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (rayon's global pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = a dedicated pool with exactly `n` threads
///
/// If a dedicated pool cannot be created the closure runs sequentially.
///
/// # Example
///
/// ```
/// use canopy::{run_with_threads, Parallelism};
///
/// let p = run_with_threads(1, |parallelism| parallelism);
/// assert_eq!(p, Parallelism::Sequential);
/// ```
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    match Parallelism::from_threads(n_threads) {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel if n_threads == 0 => f(Parallelism::Parallel),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    log::warn!(
                        target: "canopy",
                        "failed to create a {n_threads}-thread pool ({err}); running sequentially"
                    );
                    f(Parallelism::Sequential)
                }
            }
        }
    }
}
