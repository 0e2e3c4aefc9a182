#![doc = include_str!("../README.md")]
#![warn(clippy::pedantic)]
#![deny(rustdoc::broken_intra_doc_links, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! ## Crate layout
//!
//! * [`SparseMatrix`] holds the toroidal linked structure of *Dancing Links*: one
//!   header per column, one node per 1 entry, and the `cover`/`uncover` pair that
//!   hides and restores a column together with every row that meets it.
//! * [`ColumnSelector`] decides which column a search step branches on. The
//!   crate ships [`MinSize`], [`FirstColumn`], [`Uniform`] and the lossy
//!   [`StatisticalPrune`] wrapper.
//! * [`ExactCoverSolver`] runs Algorithm X, handing each exact cover to a
//!   callback as a [`Solution`].
//! * [`queens`] encodes the N-Queens problem for the solver and checks the
//!   boards it finds.

mod error;
mod links;
mod matrix;
pub mod queens;
mod selector;
mod solver;

pub use error::{ConstructionError, Error, Result, RowError};
pub use matrix::{ColumnHeader, SparseMatrix};
pub use selector::{
    ColumnSelector, DepthStatistics, FirstColumn, MinSize, PruneConfig, StatisticalPrune, Uniform,
};
pub use solver::{ExactCoverSolver, SearchStats, Solution};
