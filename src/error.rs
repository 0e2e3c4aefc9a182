use std::fmt::{Display, Formatter};

/// Errors reported while building a [`SparseMatrix`](crate::SparseMatrix) or
/// while asking it for a column to branch on.
///
/// Corruption of the link structure during a search is never reported through
/// this type: the search assumes the invariants established at construction and
/// treats a violation as a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A row was inserted after the matrix was sealed.
    InvalidState,
    /// A column was requested but every primary column is already covered.
    EmptyMatrix,
    /// The column specification given to [`SparseMatrix::new`](crate::SparseMatrix::new)
    /// is malformed.
    Construction(ConstructionError),
    /// A row given to [`SparseMatrix::add_row`](crate::SparseMatrix::add_row)
    /// was rejected.
    InvalidRow(RowError),
}

/// Reasons a column specification can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The column at `index` has the same label as an earlier column.
    DuplicateColumn { index: usize },
    /// The number of columns does not fit the node arena.
    TooManyColumns,
}

/// Reasons a row can be rejected at insertion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The row has no entries.
    Empty,
    /// The row refers to a column that does not exist.
    OutOfRange { index: usize, columns: usize },
    /// The entry at `position` is not strictly greater than its predecessor.
    NotAscending { position: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidState => write!(f, "rows cannot be added to a sealed matrix"),
            Error::EmptyMatrix => write!(f, "no primary columns remain to be covered"),
            Error::Construction(err) => write!(f, "malformed column specification: {err}"),
            Error::InvalidRow(err) => write!(f, "invalid row: {err}"),
        }
    }
}

impl Display for ConstructionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructionError::DuplicateColumn { index } => {
                write!(f, "column {index} repeats the label of an earlier column")
            }
            ConstructionError::TooManyColumns => write!(f, "too many columns"),
        }
    }
}

impl Display for RowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::Empty => write!(f, "a row must contain at least one column"),
            RowError::OutOfRange { index, columns } => {
                write!(f, "column index {index} is out of range for {columns} columns")
            }
            RowError::NotAscending { position } => write!(
                f,
                "column indices must be unique and sorted ascending (entry {position})"
            ),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for ConstructionError {}
impl std::error::Error for RowError {}

impl From<ConstructionError> for Error {
    fn from(err: ConstructionError) -> Self {
        Error::Construction(err)
    }
}

impl From<RowError> for Error {
    fn from(err: RowError) -> Self {
        Error::InvalidRow(err)
    }
}
