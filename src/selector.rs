//! Strategies for choosing the column to branch on.
//!
//! Algorithm X finds every exact cover no matter which uncovered primary column
//! it branches on at each step, but the choice decides the size of the search
//! tree. Picking the column with the fewest remaining rows (Knuth's *minimum
//! remaining values* heuristic) keeps the branching factor small and detects
//! dead ends early; [`MinSize`] implements it with a caller supplied tie-break.
//! [`Uniform`] picks at random to sidestep pathological orderings, and
//! [`FirstColumn`] simply takes the leftmost column.
//!
//! [`StatisticalPrune`] is different in kind: it wraps another selector and
//! additionally asks the search to abandon branches that remove unusually many
//! rows compared to earlier branches tried at the same depth. **This loses
//! solutions.** Use it only when a partial enumeration is acceptable.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use statrs::statistics::Statistics;

use crate::error::Result;
use crate::matrix::SparseMatrix;

/// Chooses the next column for [`ExactCoverSolver`](crate::ExactCoverSolver)
/// to cover.
pub trait ColumnSelector<L> {
    /// Returns an uncovered primary column of `matrix`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyMatrix`](crate::Error::EmptyMatrix) if every primary column
    /// is covered. The solver checks for this before asking, so an error here
    /// means a broken invariant.
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize>;

    /// Returns the pruning parameters if this selector opts the search into
    /// the lossy depth-statistics heuristic.
    fn pruning(&self) -> Option<PruneConfig> {
        None
    }
}

impl<L, S: ColumnSelector<L> + ?Sized> ColumnSelector<L> for Box<S> {
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize> {
        (**self).select(matrix)
    }

    fn pruning(&self) -> Option<PruneConfig> {
        (**self).pruning()
    }
}

/// Deterministic minimum-size selection. Ties are broken by the smallest
/// `priority` and then by ring order, so the search order is fully determined
/// by the matrix.
pub struct MinSize<P> {
    priority: P,
}

impl<P: FnMut(usize) -> usize> MinSize<P> {
    pub fn new(priority: P) -> Self {
        Self { priority }
    }
}

impl MinSize<fn(usize) -> usize> {
    /// Minimum-size selection with ties broken by ring order alone.
    #[must_use]
    pub fn plain() -> Self {
        Self { priority: |_| 0 }
    }
}

impl<L, P: FnMut(usize) -> usize> ColumnSelector<L> for MinSize<P> {
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize> {
        matrix.min_column(&mut self.priority)
    }
}

/// Always branches on the leftmost uncovered primary column.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstColumn;

impl<L> ColumnSelector<L> for FirstColumn {
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize> {
        matrix.first_column()
    }
}

/// Branches on a column chosen uniformly at random.
pub struct Uniform<R> {
    rng: R,
}

impl<R: Rng> Uniform<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Uniform<Pcg64Mcg> {
    /// Uniform selection driven by a reproducible generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Pcg64Mcg::seed_from_u64(seed))
    }
}

impl<L, R: Rng> ColumnSelector<L> for Uniform<R> {
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize> {
        matrix.random_column(&mut self.rng)
    }
}

/// Parameters of the depth-statistics pruning heuristic.
///
/// The defaults (a 1000 value sample, a bound one standard deviation above the
/// mean) are empirical; nothing guarantees they suit a particular problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneConfig {
    /// Maximum number of samples kept per depth; older samples are evicted.
    pub sample_cap: usize,
    /// How many standard deviations above the mean a branch may remove before
    /// it is abandoned.
    pub deviations: f64,
    /// Number of samples a depth needs before it prunes anything.
    pub min_samples: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            sample_cap: 1000,
            deviations: 1.0,
            min_samples: 10,
        }
    }
}

/// Wraps a selector and enables pruning with the given parameters.
///
/// Column choice is delegated unchanged. The search records, for each depth,
/// how many rows are removed from consideration when a branch is tried there,
/// and skips a branch whose count exceeds `mean + deviations · std_dev` of the
/// earlier samples at that depth. The solutions found are a subset of the ones
/// an exhaustive search finds, usually a strict one.
pub struct StatisticalPrune<S> {
    inner: S,
    config: PruneConfig,
}

impl<S> StatisticalPrune<S> {
    pub fn new(inner: S, config: PruneConfig) -> Self {
        Self { inner, config }
    }
}

impl<L, S: ColumnSelector<L>> ColumnSelector<L> for StatisticalPrune<S> {
    fn select(&mut self, matrix: &SparseMatrix<L>) -> Result<usize> {
        self.inner.select(matrix)
    }

    fn pruning(&self) -> Option<PruneConfig> {
        Some(self.config)
    }
}

/// Per-depth samples of removed-row counts, shared by every branch of one
/// search. Only meaningful for a single-threaded search: the statistics at a
/// depth summarize every branch tried there so far, not just the active path.
#[derive(Debug, Clone)]
pub struct DepthStatistics {
    config: PruneConfig,
    samples: Vec<VecDeque<f64>>,
}

impl DepthStatistics {
    #[must_use]
    pub fn new(config: PruneConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
        }
    }

    /// Number of samples currently held for `depth`.
    #[must_use]
    pub fn sample_count(&self, depth: usize) -> usize {
        self.samples.get(depth).map_or(0, VecDeque::len)
    }

    /// Returns `mean + deviations · std_dev` of the samples at `depth`, or
    /// `None` while there are too few samples to judge.
    #[must_use]
    pub fn threshold(&self, depth: usize) -> Option<f64> {
        let samples = self.samples.get(depth)?;
        // a standard deviation needs at least two values
        if samples.len() < self.config.min_samples.max(2) {
            return None;
        }
        let mean = samples.iter().mean();
        let std_dev = samples.iter().std_dev();
        Some(mean + self.config.deviations * std_dev)
    }

    /// Adds a sample for `depth`, evicting the oldest one at capacity.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, depth: usize, removed_rows: usize) {
        if self.config.sample_cap == 0 {
            return;
        }
        if self.samples.len() <= depth {
            self.samples.resize_with(depth + 1, VecDeque::new);
        }
        let samples = &mut self.samples[depth];
        if samples.len() == self.config.sample_cap {
            samples.pop_front();
        }
        samples.push_back(removed_rows as f64);
    }

    /// Judges a branch against the samples gathered so far and then records it.
    /// Returns true if the branch should be abandoned.
    #[allow(clippy::cast_precision_loss)]
    pub fn should_prune(&mut self, depth: usize, removed_rows: usize) -> bool {
        let prune = self
            .threshold(depth)
            .is_some_and(|bound| removed_rows as f64 > bound);
        self.record(depth, removed_rows);
        prune
    }
}
