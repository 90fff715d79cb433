//! Training progress logging.
//!
//! [`TrainingLogger`] reports build, update and strip progress through the
//! [`log`] facade under the `canopy` target. [`Verbosity`] gates which events
//! are emitted at all; the installed logger (e.g. `env_logger`) then filters
//! by level as usual.

use std::time::Instant;

use crate::repr::Tree;

const TARGET: &str = "canopy";

/// How much the builder reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Nothing.
    #[default]
    Silent,
    /// Warnings only.
    Warning,
    /// Start/finish summaries.
    Info,
    /// Per-split detail.
    Debug,
}

/// Counters collected while an update runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// New rows routed into leaves.
    pub routed: usize,
    /// Leaves re-split from their own rows.
    pub resplit: usize,
    /// Sibling leaf pairs rebuilt over their combined rows.
    pub combined: usize,
}

/// Emits training events according to a [`Verbosity`].
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    start: Option<Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            start: None,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && self.verbosity >= level
    }

    fn elapsed_ms(&self) -> f64 {
        self.start
            .map(|s| s.elapsed().as_secs_f64() * 1e3)
            .unwrap_or(0.0)
    }

    pub fn start_build(&mut self, n_rows: usize, n_attributes: usize) {
        self.start = Some(Instant::now());
        if self.enabled(Verbosity::Info) {
            log::info!(
                target: TARGET,
                "building tree: {n_rows} rows, {n_attributes} attributes"
            );
        }
    }

    pub fn log_split(&self, depth: u32, attribute: &str, score: f64, n_in: usize, n_out: usize) {
        if self.enabled(Verbosity::Debug) {
            log::debug!(
                target: TARGET,
                "depth {depth}: split on {attribute:?} (score {score:.6}, {n_in} in / {n_out} out)"
            );
        }
    }

    pub fn finish_build(&mut self, tree: &Tree) {
        if self.enabled(Verbosity::Info) {
            log::info!(
                target: TARGET,
                "built tree: {} nodes, {} leaves, max depth {}, mean depth {:.2} in {:.1}ms",
                tree.n_nodes(),
                tree.n_leaves(),
                tree.max_depth(),
                tree.mean_depth(),
                self.elapsed_ms()
            );
        }
        self.start = None;
    }

    pub fn start_update(&mut self, n_new_rows: usize, split_nodes: bool) {
        self.start = Some(Instant::now());
        if self.enabled(Verbosity::Info) {
            log::info!(
                target: TARGET,
                "updating tree: {n_new_rows} new rows, split_nodes={split_nodes}"
            );
        }
    }

    pub fn finish_update(&mut self, tree: &Tree, stats: &UpdateStats) {
        if self.enabled(Verbosity::Info) {
            log::info!(
                target: TARGET,
                "updated tree: routed {}, re-split {}, combined {}; now {} nodes in {:.1}ms",
                stats.routed,
                stats.resplit,
                stats.combined,
                tree.n_nodes(),
                self.elapsed_ms()
            );
        }
        self.start = None;
    }

    pub fn log_strip(&self, n_leaves: usize) {
        if self.enabled(Verbosity::Info) {
            log::info!(target: TARGET, "stripped rows from {n_leaves} leaves");
        }
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        if self.enabled(Verbosity::Warning) {
            log::warn!(target: TARGET, "{message}");
        }
    }
}
