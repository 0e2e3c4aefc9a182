//! # The N-Queens problem as exact cover
//!
//! Placing `n` queens on an `n`×`n` board so that no two attack each other is an
//! exact cover problem with secondary columns. Each of the `n` ranks and each of
//! the `n` files must hold exactly one queen, so those `2n` columns are primary.
//! Each of the `2n - 1` diagonals and `2n - 1` anti-diagonals may hold at most
//! one queen, so those columns are secondary. Every cell `(i, j)` is a row
//! with a 1 in rank `i`, file `j`, diagonal `i + j` and anti-diagonal
//! `n - 1 - i + j`.

use std::fmt::{Display, Formatter};

use colored::Colorize;

use crate::error::Result;
use crate::matrix::SparseMatrix;
use crate::solver::Solution;

/// A column of the N-Queens matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    /// Exactly one queen in rank `i`.
    Rank(usize),
    /// Exactly one queen in file `j`.
    File(usize),
    /// At most one queen on the cells with `i + j` equal to the index.
    Diagonal(usize),
    /// At most one queen on the cells with `n - 1 - i + j` equal to the index.
    AntiDiagonal(usize),
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Rank(i) => write!(f, "rank {i}"),
            Constraint::File(j) => write!(f, "file {j}"),
            Constraint::Diagonal(d) => write!(f, "diagonal {d}"),
            Constraint::AntiDiagonal(d) => write!(f, "anti-diagonal {d}"),
        }
    }
}

/// Encodes an `n`×`n` board for [`SparseMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NQueens {
    n: usize,
}

impl NQueens {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Returns the `6n - 2` columns: ranks and files (primary), then diagonals
    /// and anti-diagonals (secondary).
    pub fn columns(&self) -> impl Iterator<Item = (Constraint, bool)> {
        let n = self.n;
        let diagonals = (2 * n).saturating_sub(1);
        (0..n)
            .map(|i| (Constraint::Rank(i), true))
            .chain((0..n).map(|j| (Constraint::File(j), true)))
            .chain((0..diagonals).map(|d| (Constraint::Diagonal(d), false)))
            .chain((0..diagonals).map(|d| (Constraint::AntiDiagonal(d), false)))
    }

    /// Returns the ascending column indices of the row for cell `(i, j)`.
    #[must_use]
    pub fn row_for(&self, i: usize, j: usize) -> [usize; 4] {
        let n = self.n;
        debug_assert!(i < n && j < n, "cell ({i}, {j}) is off the board");
        [i, n + j, 2 * n + i + j, 5 * n - 2 - i + j]
    }

    /// Returns the cell that row `row` of [`matrix`](Self::matrix) stands for.
    #[must_use]
    pub fn cell_of(&self, row: usize) -> (usize, usize) {
        (row / self.n, row % self.n)
    }

    /// Builds the sealed matrix, one row per cell in row-major order, so the
    /// row id of cell `(i, j)` is `i * n + j`.
    ///
    /// # Errors
    ///
    /// Only if the encoding itself is broken.
    pub fn matrix(&self) -> Result<SparseMatrix<Constraint>> {
        let mut matrix = SparseMatrix::new(self.columns())?;
        for i in 0..self.n {
            for j in 0..self.n {
                matrix.add_row(&self.row_for(i, j))?;
            }
        }
        matrix.seal();
        Ok(matrix)
    }

    /// Tie-break for [`MinSize`](crate::MinSize): ranks and files closer to the
    /// middle of the board go first, since a queen there attacks more cells.
    /// The value is twice the distance from the centre so that it stays integral.
    #[must_use]
    pub fn priority(&self, column: usize) -> usize {
        let index = if column < self.n {
            column
        } else if column < 2 * self.n {
            column - self.n
        } else {
            return usize::MAX;
        };
        (2 * index).abs_diff(self.n - 1)
    }

    /// Converts a solution of [`matrix`](Self::matrix) into queen positions
    /// `(rank, file)`, sorted by rank.
    #[must_use]
    pub fn decode(&self, solution: &Solution<'_, Constraint>) -> Vec<(usize, usize)> {
        let mut queens: Vec<_> = solution.rows().map(|row| self.cell_of(row)).collect();
        queens.sort_unstable();
        queens
    }

    /// Checks that `queens` holds `n` queens of which no two share a rank, a
    /// file or either diagonal.
    #[must_use]
    pub fn is_valid(&self, queens: &[(usize, usize)]) -> bool {
        let n = self.n;
        if queens.len() != n {
            return false;
        }
        let diagonals = (2 * n).saturating_sub(1);
        let mut ranks = vec![false; n];
        let mut files = vec![false; n];
        let mut diagonal = vec![false; diagonals];
        let mut anti_diagonal = vec![false; diagonals];
        queens.iter().all(|&(i, j)| {
            i < n
                && j < n
                && !std::mem::replace(&mut ranks[i], true)
                && !std::mem::replace(&mut files[j], true)
                && !std::mem::replace(&mut diagonal[i + j], true)
                && !std::mem::replace(&mut anti_diagonal[n - 1 - i + j], true)
        })
    }
}

/// A board with queens placed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    n: usize,
    /// `files[i]` is the file of the queen in rank `i`, if any
    files: Vec<Option<usize>>,
}

impl Board {
    /// Places the given `(rank, file)` queens on an empty `n`×`n` board.
    ///
    /// # Panics
    ///
    /// If a queen is off the board.
    #[must_use]
    pub fn new(n: usize, queens: &[(usize, usize)]) -> Self {
        let mut files = vec![None; n];
        for &(i, j) in queens {
            assert!(i < n && j < n, "queen ({i}, {j}) is off the board");
            files[i] = Some(j);
        }
        Self { n, files }
    }

    /// Renders the board with the queens highlighted for a terminal.
    #[must_use]
    pub fn colored(&self) -> String {
        self.render(|queen| {
            if queen {
                "Q".yellow().bold().to_string()
            } else {
                ".".dimmed().to_string()
            }
        })
    }

    /// Draws rank `n - 1` at the top, framed by `+-...-+` lines.
    fn render<F: Fn(bool) -> String>(&self, cell: F) -> String {
        let frame = format!("+-{}+", "--".repeat(self.n));
        let mut out = String::new();
        out.push_str(&frame);
        out.push('\n');
        for rank in (0..self.n).rev() {
            out.push_str("| ");
            for file in 0..self.n {
                out.push_str(&cell(self.files[rank] == Some(file)));
                out.push(' ');
            }
            out.push_str("|\n");
        }
        out.push_str(&frame);
        out
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let plain = self.render(|queen| if queen { "Q" } else { "." }.to_string());
        f.write_str(&plain)
    }
}

/// Plain backtracking over permutations, with occupancy tables for files and
/// both diagonals. Serves as an independent check on the exact cover search.
pub mod backtrack {
    /// Outcome of [`count`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Count {
        pub solutions: u64,
        /// Calls of the recursive placement procedure.
        pub subproblems: u64,
    }

    struct Occupancy {
        n: usize,
        files: Vec<bool>,
        diagonals: Vec<bool>,
        anti_diagonals: Vec<bool>,
        count: Count,
    }

    impl Occupancy {
        fn is_safe(&self, rank: usize, file: usize) -> bool {
            !self.files[file]
                && !self.diagonals[rank + file]
                && !self.anti_diagonals[self.n - 1 - rank + file]
        }

        fn set(&mut self, rank: usize, file: usize, occupied: bool) {
            self.files[file] = occupied;
            self.diagonals[rank + file] = occupied;
            self.anti_diagonals[self.n - 1 - rank + file] = occupied;
        }

        fn place(&mut self, rank: usize) {
            self.count.subproblems += 1;
            if rank == self.n {
                self.count.solutions += 1;
                return;
            }
            for file in 0..self.n {
                if self.is_safe(rank, file) {
                    self.set(rank, file, true);
                    self.place(rank + 1);
                    self.set(rank, file, false);
                }
            }
        }
    }

    /// Counts the solutions of the `n` queens problem one rank at a time.
    #[must_use]
    pub fn count(n: usize) -> Count {
        let diagonals = (2 * n).saturating_sub(1);
        let mut occupancy = Occupancy {
            n,
            files: vec![false; n],
            diagonals: vec![false; diagonals],
            anti_diagonals: vec![false; diagonals],
            count: Count {
                solutions: 0,
                subproblems: 0,
            },
        };
        occupancy.place(0);
        occupancy.count
    }

}
