use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::error::Result;
use crate::matrix::SparseMatrix;
use crate::selector::{ColumnSelector, DepthStatistics};

/// An exact cover found by [`ExactCoverSolver::run`], borrowed from the live
/// matrix for the duration of the callback.
///
/// Rows are listed in the order the search selected them, i.e. by depth.
pub struct Solution<'m, L> {
    matrix: &'m SparseMatrix<L>,
    /// the entry node through which each row was selected
    path: &'m [usize],
}

impl<'m, L> Solution<'m, L> {
    /// Returns the number of rows in the cover.
    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns the ids of the selected rows, by depth.
    pub fn rows(&self) -> impl Iterator<Item = usize> + 'm {
        let (matrix, path) = (self.matrix, self.path);
        path.iter().map(move |&node| matrix.row_of(node))
    }

    /// Returns the labels of the columns satisfied by `row`, in column order.
    ///
    /// # Panics
    ///
    /// If `row` is not a row id of the matrix.
    pub fn columns(&self, row: usize) -> impl Iterator<Item = &'m L> + 'm {
        let matrix = self.matrix;
        matrix
            .row_columns(row)
            .map(move |column| matrix.label(column))
    }

    /// Materializes the cover as a map from row id to the labels of the
    /// columns that row satisfies.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<usize, Vec<&'m L>> {
        self.rows()
            .map(|row| (row, self.columns(row).collect()))
            .collect()
    }
}

/// Counters reported at the end of a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Exact covers handed to the callback.
    pub solutions: u64,
    /// Calls of the recursive search procedure, solved leaves included.
    pub nodes: u64,
    /// Branches abandoned by the pruning heuristic.
    pub pruned: u64,
    /// Whether the callback ended the search early.
    pub stopped: bool,
}

/// State threaded through one search: the row chosen at every depth of the
/// active path, the counters and, if pruning was requested, the per-depth
/// statistics.
struct SearchContext {
    path: Vec<usize>,
    statistics: Option<DepthStatistics>,
    stats: SearchStats,
}

/// Knuth's Algorithm X over a [`SparseMatrix`], branching on the columns
/// picked by a [`ColumnSelector`].
///
/// The search is depth first and recursive. The recursion depth is bounded by
/// the number of primary columns, since each level covers at least one.
pub struct ExactCoverSolver<S> {
    selector: S,
}

impl<S> ExactCoverSolver<S> {
    pub fn new(selector: S) -> Self {
        Self { selector }
    }

    /// Seals `matrix` and calls `visit` on every exact cover. The search stops
    /// early as soon as `visit` returns [`ControlFlow::Break`].
    ///
    /// Whether the search completes, is stopped or fails, every cover performed
    /// is undone before this method returns, so the matrix is left exactly as
    /// it was given.
    ///
    /// # Errors
    ///
    /// Propagates errors from the selector. With the selectors of this crate an
    /// error means a broken invariant, since the search never asks for a column
    /// once all primary columns are covered.
    pub fn run<L, F>(&mut self, matrix: &mut SparseMatrix<L>, mut visit: F) -> Result<SearchStats>
    where
        S: ColumnSelector<L>,
        F: FnMut(&Solution<'_, L>) -> ControlFlow<()>,
    {
        matrix.seal();
        let pruning = self.selector.pruning();
        if let Some(config) = pruning {
            log::debug!("searching with statistical pruning: {config:?}");
        }
        let mut ctx = SearchContext {
            path: Vec::new(),
            statistics: pruning.map(DepthStatistics::new),
            stats: SearchStats::default(),
        };
        let flow = self.search(matrix, &mut ctx, &mut visit)?;
        ctx.stats.stopped = flow.is_break();
        log::debug!("search finished: {:?}", ctx.stats);
        Ok(ctx.stats)
    }

    /// Visits every exact cover without stopping and returns the counters.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn count<L>(&mut self, matrix: &mut SparseMatrix<L>) -> Result<SearchStats>
    where
        S: ColumnSelector<L>,
    {
        self.run(matrix, |_| ControlFlow::Continue(()))
    }

    /// Returns the row ids of the first exact cover found, if any.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn first<L>(&mut self, matrix: &mut SparseMatrix<L>) -> Result<Option<Vec<usize>>>
    where
        S: ColumnSelector<L>,
    {
        let mut found = None;
        self.run(matrix, |solution| {
            found = Some(solution.rows().collect());
            ControlFlow::Break(())
        })?;
        Ok(found)
    }

    fn search<L, F>(
        &mut self,
        matrix: &mut SparseMatrix<L>,
        ctx: &mut SearchContext,
        visit: &mut F,
    ) -> Result<ControlFlow<()>>
    where
        S: ColumnSelector<L>,
        F: FnMut(&Solution<'_, L>) -> ControlFlow<()>,
    {
        ctx.stats.nodes += 1;
        if matrix.is_solved() {
            ctx.stats.solutions += 1;
            log::debug!(
                "solution {} with {} rows",
                ctx.stats.solutions,
                ctx.path.len()
            );
            let solution = Solution {
                matrix,
                path: &ctx.path,
            };
            return Ok(visit(&solution));
        }

        let column = self.selector.select(matrix)?;
        log::trace!(
            "depth {}: covering column {column} with {} rows",
            ctx.path.len(),
            matrix.size(column)
        );
        matrix.cover(column);
        let flow = self.branch(matrix, ctx, visit, column);
        matrix.uncover(column);
        flow
    }

    /// Tries every row of the covered `column` in turn.
    fn branch<L, F>(
        &mut self,
        matrix: &mut SparseMatrix<L>,
        ctx: &mut SearchContext,
        visit: &mut F,
        column: usize,
    ) -> Result<ControlFlow<()>>
    where
        S: ColumnSelector<L>,
        F: FnMut(&Solution<'_, L>) -> ControlFlow<()>,
    {
        let depth = ctx.path.len();
        let mut next = matrix.first_in_column(column);
        while let Some(node) = next {
            ctx.path.push(node);
            matrix.cover_row_others(node);

            let removed = matrix.removed_rows();
            let admitted = ctx
                .statistics
                .as_mut()
                .map_or(true, |statistics| !statistics.should_prune(depth, removed));
            let flow = if admitted {
                self.search(matrix, ctx, visit)
            } else {
                ctx.stats.pruned += 1;
                log::trace!(
                    "pruned row {} at depth {depth} ({removed} rows removed)",
                    matrix.row_of(node)
                );
                Ok(ControlFlow::Continue(()))
            };

            matrix.uncover_row_others(node);
            ctx.path.pop();
            if flow?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
            next = matrix.next_in_column(node);
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::selector::{FirstColumn, MinSize, PruneConfig, StatisticalPrune, Uniform};

    fn knuth_example() -> SparseMatrix<char> {
        let mut x = SparseMatrix::new(('a'..='g').map(|c| (c, true))).unwrap();
        x.add_row(&[2, 4]).unwrap();
        x.add_row(&[0, 3, 6]).unwrap();
        x.add_row(&[1, 2, 5]).unwrap();
        x.add_row(&[0, 3, 5]).unwrap();
        x.add_row(&[1, 6]).unwrap();
        x.add_row(&[3, 4, 6]).unwrap();
        x
    }

    fn snapshot<L>(x: &SparseMatrix<L>) -> (Vec<usize>, Vec<usize>, usize) {
        (
            x.active_columns().collect(),
            (0..x.column_count()).map(|c| x.size(c)).collect(),
            x.removed_rows(),
        )
    }

    fn all_solutions<S: ColumnSelector<char>>(selector: S) -> Vec<Vec<usize>> {
        let mut x = knuth_example();
        let mut solutions = Vec::new();
        ExactCoverSolver::new(selector)
            .run(&mut x, |solution| {
                let mut rows: Vec<_> = solution.rows().collect();
                rows.sort_unstable();
                solutions.push(rows);
                ControlFlow::Continue(())
            })
            .unwrap();
        solutions
    }

    #[test]
    fn solve_knuth_example() {
        let mut x = knuth_example();
        let before = snapshot(&x);
        let mut solver = ExactCoverSolver::new(MinSize::plain());
        let mut seen = 0;
        let stats = solver
            .run(&mut x, |solution| {
                assert_eq!(solution.len(), 3);
                let map = solution.to_map();
                assert_eq!(map.len(), 3);
                assert_eq!(map[&3], [&'a', &'d', &'f']);
                assert_eq!(map[&4], [&'b', &'g']);
                assert_eq!(map[&0], [&'c', &'e']);
                seen += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(seen, 1);
        assert_eq!(stats.solutions, 1);
        assert!(!stats.stopped);
        assert_eq!(stats.pruned, 0);
        assert!(x.is_sealed());
        assert_eq!(snapshot(&x), before);
    }

    #[test]
    fn every_selector_finds_the_same_cover() {
        assert_eq!(all_solutions(MinSize::plain()), [[0, 3, 4]]);
        assert_eq!(all_solutions(FirstColumn), [[0, 3, 4]]);
        for seed in 0..10 {
            assert_eq!(all_solutions(Uniform::seeded(seed)), [[0, 3, 4]]);
        }
    }

    #[test]
    fn rows_are_listed_by_depth() {
        let mut x = knuth_example();
        // a has the fewest rows and comes first; only row 3 survives under it
        let rows = ExactCoverSolver::new(MinSize::plain())
            .first(&mut x)
            .unwrap()
            .unwrap();
        assert_eq!(rows[0], 3);
        let mut sorted = rows.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, [0, 3, 4]);
    }

    #[test]
    fn empty_matrix_has_one_empty_cover() {
        let mut x: SparseMatrix<u8> = SparseMatrix::new([]).unwrap();
        let mut calls = 0;
        let stats = ExactCoverSolver::new(MinSize::plain())
            .run(&mut x, |solution| {
                assert!(solution.is_empty());
                calls += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(stats.nodes, 1);
    }

    #[test]
    fn uncoverable_column_has_no_cover() {
        let mut x = SparseMatrix::new([('a', true), ('b', true)]).unwrap();
        x.add_row(&[0]).unwrap();
        let stats = ExactCoverSolver::new(MinSize::plain()).count(&mut x).unwrap();
        assert_eq!(stats.solutions, 0);
        // b is chosen (size 0) and has no row to try
        assert_eq!(stats.nodes, 1);
    }

    #[test]
    fn secondary_columns_need_not_be_covered() {
        let mut x = SparseMatrix::new([('p', true), ('q', true), ('s', false)]).unwrap();
        x.add_row(&[0, 2]).unwrap();
        x.add_row(&[1, 2]).unwrap();
        x.add_row(&[0]).unwrap();
        x.add_row(&[1]).unwrap();
        let stats = ExactCoverSolver::new(MinSize::plain()).count(&mut x).unwrap();
        // {0, 3}, {2, 1} and {2, 3}; {0, 1} would cover s twice
        assert_eq!(stats.solutions, 3);
    }

    #[test]
    fn break_stops_after_one_solution() {
        let mut x = SparseMatrix::new([('a', true), ('b', true)]).unwrap();
        for _ in 0..4 {
            x.add_row(&[0]).unwrap();
            x.add_row(&[1]).unwrap();
        }
        let before = snapshot(&x);
        let mut calls = 0;
        let stats = ExactCoverSolver::new(Uniform::seeded(3))
            .run(&mut x, |_| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(stats.solutions, 1);
        assert!(stats.stopped);
        assert_eq!(snapshot(&x), before);

        // the matrix can be searched again afterwards
        let stats = ExactCoverSolver::new(MinSize::plain()).count(&mut x).unwrap();
        assert_eq!(stats.solutions, 16);
    }

    /// Succeeds a fixed number of times, then reports an empty matrix.
    struct Failing {
        remaining: usize,
    }

    impl ColumnSelector<char> for Failing {
        fn select(&mut self, matrix: &SparseMatrix<char>) -> Result<usize> {
            if self.remaining == 0 {
                return Err(Error::EmptyMatrix);
            }
            self.remaining -= 1;
            matrix.min_column(|_| 0)
        }
    }

    #[test]
    fn errors_unwind_every_cover() {
        let mut x = knuth_example();
        let before = snapshot(&x);
        let result = ExactCoverSolver::new(Failing { remaining: 2 }).count(&mut x);
        assert_eq!(result, Err(Error::EmptyMatrix));
        assert_eq!(snapshot(&x), before);
    }

    #[test]
    fn pruning_only_removes_solutions() {
        let mut x = SparseMatrix::new((0..4).map(|c| (c, true))).unwrap();
        for a in 0..4 {
            for b in a + 1..4 {
                x.add_row(&[a, b]).unwrap();
            }
            x.add_row(&[a]).unwrap();
        }
        let mut exhaustive = Vec::new();
        ExactCoverSolver::new(MinSize::plain())
            .run(&mut x, |s| {
                exhaustive.push(s.to_map().into_keys().collect::<Vec<_>>());
                ControlFlow::Continue(())
            })
            .unwrap();

        let config = PruneConfig {
            min_samples: 2,
            deviations: 0.0,
            ..PruneConfig::default()
        };
        let mut pruned = Vec::new();
        let stats = ExactCoverSolver::new(StatisticalPrune::new(MinSize::plain(), config))
            .run(&mut x, |s| {
                pruned.push(s.to_map().into_keys().collect::<Vec<_>>());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert!(stats.pruned > 0);
        assert!(pruned.len() < exhaustive.len());
        for solution in &pruned {
            assert!(exhaustive.contains(solution), "{solution:?} was invented");
        }
        assert_eq!(x.removed_rows(), 0);
    }
}
