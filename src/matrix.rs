use std::collections::HashSet;
use std::hash::Hash;

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::error::{ConstructionError, Error, Result, RowError};
use crate::links::{DoubleIndexLink, DoubleIndexLinkedList, LinkIterator};

/// Index of the root sentinel, the head of the ring of uncovered primary columns.
const ROOT: usize = 0;

/// Marks nodes that do not belong to a row (the root and the column headers).
const NO_ROW: usize = usize::MAX;

/// Identity and bookkeeping of one column.
#[derive(Debug, Clone)]
pub struct ColumnHeader<L> {
    label: L,
    primary: bool,
    /// Number of entries currently reachable in the column's vertical ring.
    size: usize,
}

impl<L> ColumnHeader<L> {
    #[must_use]
    pub fn label(&self) -> &L {
        &self.label
    }

    /// Primary columns must be covered exactly once by every solution, secondary
    /// columns at most once.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Toroidal "dancing links" representation of a sparse 0/1 matrix.
///
/// Columns are addressed by their position in the list given to
/// [`new`](Self::new); rows by the id returned from [`add_row`](Self::add_row).
/// Rows are added first, then the matrix is [sealed](Self::seal) and handed to
/// a search, which removes and restores columns with [`cover`](Self::cover) and
/// [`uncover`](Self::uncover). Nothing is deallocated until the matrix is
/// dropped.
///
/// Calling `cover`/`uncover` out of order (anything other than a strict stack
/// discipline) silently corrupts the links. Enable [`debug_assert!`] for some
/// sanity checks when debugging.

// ## Implementation Notes
//
// Every node lives in one arena and is addressed by its index. Index 0 is the
// root, indices 1..=C are the column headers (column `c` has header `c + 1`),
// and the 1-entries of the rows follow in insertion order. The arena is stored
// as a structure of arrays: `h_links` joins the header ring and each row ring,
// `v_links` joins each column ring through its header, `column` names the
// column a node belongs to and `row` the row it belongs to (`NO_ROW` for the
// root and the headers). Secondary headers are never linked into the root's
// ring, so only primary columns are ever offered for branching.
#[derive(Debug, Clone)]
pub struct SparseMatrix<L> {
    headers: Vec<ColumnHeader<L>>,
    h_links: Vec<DoubleIndexLink>,
    v_links: Vec<DoubleIndexLink>,
    column: Vec<usize>,
    row: Vec<usize>,
    /// first node of each row, indexed by row id
    row_heads: Vec<usize>,
    /// rows currently hidden from every column by covers
    removed_rows: usize,
    sealed: bool,
}

impl<L> SparseMatrix<L> {
    /// Creates a matrix without rows from a sequence of `(label, is_primary)`
    /// column specifications. Only primary columns are linked into the ring of
    /// columns that must be covered, in the order given.
    ///
    /// # Errors
    ///
    /// [`Error::Construction`] if two columns share a label or the column count
    /// overflows the node arena.
    pub fn new<I>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (L, bool)>,
        L: Eq + Hash,
    {
        let headers: Vec<ColumnHeader<L>> = columns
            .into_iter()
            .map(|(label, primary)| ColumnHeader {
                label,
                primary,
                size: 0,
            })
            .collect();
        if let Some(index) = first_duplicate(&headers) {
            return Err(ConstructionError::DuplicateColumn { index }.into());
        }
        let len = headers
            .len()
            .checked_add(1)
            .ok_or(ConstructionError::TooManyColumns)?;

        let mut h_links = Vec::with_capacity(len);
        h_links.push(DoubleIndexLink::singleton(ROOT));
        for (column, header) in headers.iter().enumerate() {
            let node = column + 1;
            h_links.push(DoubleIndexLink::singleton(node));
            if header.primary {
                h_links.insert_before(ROOT, node);
            }
        }
        let v_links = (0..len).map(DoubleIndexLink::singleton).collect();
        let column = std::iter::once(0).chain(0..headers.len()).collect();

        Ok(Self {
            headers,
            h_links,
            v_links,
            column,
            row: vec![NO_ROW; len],
            row_heads: Vec::new(),
            removed_rows: 0,
            sealed: false,
        })
    }

    /// Appends a row with a 1 in each of the given columns and returns its id.
    ///
    /// Row ids are assigned consecutively starting at 0. Each new entry goes to
    /// the bottom of its column, and the entries of the row are linked left to
    /// right in the order given.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] if the matrix has been [sealed](Self::seal).
    /// * [`Error::InvalidRow`] if `indices` is empty, names a column that does
    ///   not exist, or is not strictly ascending.
    pub fn add_row(&mut self, indices: &[usize]) -> Result<usize> {
        if self.sealed {
            return Err(Error::InvalidState);
        }
        if indices.is_empty() {
            return Err(RowError::Empty.into());
        }
        let columns = self.headers.len();
        for (position, &index) in indices.iter().enumerate() {
            if index >= columns {
                return Err(RowError::OutOfRange { index, columns }.into());
            }
            if position > 0 && index <= indices[position - 1] {
                return Err(RowError::NotAscending { position }.into());
            }
        }

        let row = self.row_heads.len();
        let first = self.v_links.len();
        for (offset, &column) in indices.iter().enumerate() {
            let node = first + offset;
            self.h_links.push(DoubleIndexLink::singleton(node));
            self.v_links.push(DoubleIndexLink::singleton(node));
            self.column.push(column);
            self.row.push(row);
            self.v_links.insert_before(column + 1, node);
            if offset > 0 {
                self.h_links.insert_before(first, node);
            }
            self.headers[column].size += 1;
        }
        self.row_heads.push(first);
        Ok(row)
    }

    /// Closes the matrix to further row insertion.
    pub fn seal(&mut self) {
        if !self.sealed {
            log::debug!(
                "sealed matrix with {} columns ({} primary), {} rows and {} entries",
                self.column_count(),
                self.headers.iter().filter(|h| h.primary).count(),
                self.row_count(),
                self.v_links.len() - self.headers.len() - 1
            );
        }
        self.sealed = true;
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_heads.len()
    }

    /// Returns the header of `column`.
    ///
    /// # Panics
    ///
    /// If `column` is out of range.
    #[must_use]
    pub fn header(&self, column: usize) -> &ColumnHeader<L> {
        &self.headers[column]
    }

    /// Shorthand for `self.header(column).label()`.
    #[must_use]
    pub fn label(&self, column: usize) -> &L {
        &self.headers[column].label
    }

    /// Shorthand for `self.header(column).size()`.
    #[must_use]
    pub fn size(&self, column: usize) -> usize {
        self.headers[column].size
    }

    #[must_use]
    pub fn is_primary(&self, column: usize) -> bool {
        self.headers[column].primary
    }

    /// Returns true once every primary column has been covered.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.h_links[ROOT].next == ROOT
    }

    /// Returns an iterator over the uncovered primary columns, in ring order.
    pub fn active_columns(&self) -> impl Iterator<Item = usize> + '_ {
        LinkIterator::from_slice(&self.h_links, ROOT).map(|node| node - 1)
    }

    /// Returns the number of rows that covers have removed from consideration.
    #[must_use]
    pub fn removed_rows(&self) -> usize {
        self.removed_rows
    }

    /// Returns the columns of `row` in ascending order.
    ///
    /// # Panics
    ///
    /// If `row` is not a row id of this matrix.
    pub fn row_columns(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.row_nodes(self.row_heads[row])
            .map(move |node| self.column[node])
    }

    /// Returns the uncovered primary column with the fewest entries. Ties go to
    /// the column with the smallest `priority`, then to the one met first in the
    /// ring.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyMatrix`] if every primary column is covered.
    pub fn min_column<K, F>(&self, mut priority: F) -> Result<usize>
    where
        K: Ord,
        F: FnMut(usize) -> K,
    {
        self.active_columns()
            .min_by_key(|&column| (self.headers[column].size, priority(column)))
            .ok_or(Error::EmptyMatrix)
    }

    /// Returns an uncovered primary column chosen uniformly at random.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyMatrix`] if every primary column is covered.
    pub fn random_column<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        self.active_columns().choose(rng).ok_or(Error::EmptyMatrix)
    }

    /// Returns the leftmost uncovered primary column.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyMatrix`] if every primary column is covered.
    pub fn first_column(&self) -> Result<usize> {
        self.active_columns().next().ok_or(Error::EmptyMatrix)
    }

    /// Removes `column` from the header ring and hides every row that has an
    /// entry in it from all the other columns.
    ///
    /// The column must not be covered already.
    pub fn cover(&mut self, column: usize) {
        let head = column + 1;
        debug_assert!(head < self.headers.len() + 1, "{column} must be a column");
        debug_assert!(
            !self.headers[column].primary || !self.h_links.is_removed(head),
            "column {column} must not already be covered"
        );
        self.h_links.remove_links(head);
        let mut node = self.v_links[head].next;
        while node != head {
            let mut other = self.h_links[node].next;
            while other != node {
                self.v_links.remove_links(other);
                self.headers[self.column[other]].size -= 1;
                other = self.h_links[other].next;
            }
            self.removed_rows += 1;
            node = self.v_links[node].next;
        }
    }

    /// Undoes [`cover`](Self::cover). Rows are restored bottom to top and the
    /// entries of each row right to left, the mirror image of the covering order.
    pub fn uncover(&mut self, column: usize) {
        let head = column + 1;
        debug_assert!(head < self.headers.len() + 1, "{column} must be a column");
        let mut node = self.v_links[head].prev;
        while node != head {
            let mut other = self.h_links[node].prev;
            while other != node {
                self.headers[self.column[other]].size += 1;
                self.v_links.restore_links(other);
                other = self.h_links[other].prev;
            }
            self.removed_rows -= 1;
            node = self.v_links[node].prev;
        }
        self.h_links.restore_links(head);
    }

    // node level access for the search

    /// First entry in the ring of `column`, if the ring is not empty.
    pub(crate) fn first_in_column(&self, column: usize) -> Option<usize> {
        self.next_in_column(column + 1)
    }

    /// The entry below `node`, or `None` when `node` is the last one.
    pub(crate) fn next_in_column(&self, node: usize) -> Option<usize> {
        let next = self.v_links[node].next;
        (next > self.headers.len()).then_some(next)
    }

    pub(crate) fn row_of(&self, node: usize) -> usize {
        debug_assert!(self.row[node] != NO_ROW, "node {node} must be a row entry");
        self.row[node]
    }

    /// Covers the columns of every entry in the row of `node` except `node`
    /// itself, left to right.
    pub(crate) fn cover_row_others(&mut self, node: usize) {
        let mut other = self.h_links[node].next;
        while other != node {
            self.cover(self.column[other]);
            other = self.h_links[other].next;
        }
    }

    /// Undoes [`cover_row_others`](Self::cover_row_others), right to left.
    pub(crate) fn uncover_row_others(&mut self, node: usize) {
        let mut other = self.h_links[node].prev;
        while other != node {
            self.uncover(self.column[other]);
            other = self.h_links[other].prev;
        }
    }

    /// Visits the row ring starting at `start`.
    fn row_nodes(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(start), move |&node| {
            Some(self.h_links[node].next).filter(|&next| next != start)
        })
    }
}

/// Position of the first header whose label already appeared earlier.
fn first_duplicate<L: Eq + Hash>(headers: &[ColumnHeader<L>]) -> Option<usize> {
    let mut seen = HashSet::with_capacity(headers.len());
    headers.iter().position(|header| !seen.insert(&header.label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn count_items_backward(links: &[DoubleIndexLink], head: usize) -> usize {
        let mut n = 0;
        let mut i = head;
        while head != links[i].prev {
            n += 1;
            i = links[i].prev;
        }
        n
    }

    fn count_items_forward(links: &[DoubleIndexLink], head: usize) -> usize {
        let mut n = 0;
        let mut i = head;
        while head != links[i].next {
            n += 1;
            i = links[i].next;
        }
        n
    }

    /// The toy problem from Knuth's "Dancing Links" paper, columns `a..=g`.
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

    fn sizes<L>(x: &SparseMatrix<L>) -> Vec<usize> {
        (0..x.column_count()).map(|c| x.size(c)).collect()
    }

    fn column_rows<L>(x: &SparseMatrix<L>, column: usize) -> Vec<usize> {
        let mut rows = Vec::new();
        let mut node = x.first_in_column(column);
        while let Some(n) = node {
            rows.push(x.row_of(n));
            node = x.next_in_column(n);
        }
        rows
    }

    #[test]
    fn new_links_only_primary_columns() {
        let x = SparseMatrix::new([(1, true), (2, true), (3, false), (4, true), (5, false)]).unwrap();
        assert_eq!(x.active_columns().collect::<Vec<_>>(), [0, 1, 3]);
        assert_eq!(count_items_forward(&x.h_links, ROOT), 3);
        assert_eq!(count_items_backward(&x.h_links, ROOT), 3);
        // secondary headers form rings of their own
        assert_eq!(count_items_forward(&x.h_links, 3), 0);
        assert_eq!(count_items_forward(&x.h_links, 5), 0);
        assert!(!x.header(2).is_primary());
        assert!(x.is_primary(3));
        assert!(!x.is_primary(4));
        assert_eq!(x.h_links.len(), 6);
        assert_eq!(x.v_links.len(), 6);
    }

    #[test]
    fn new_empty() {
        let x: SparseMatrix<u8> = SparseMatrix::new([]).unwrap();
        assert!(x.is_solved());
        assert_eq!(x.min_column(|_| 0), Err(Error::EmptyMatrix));
        assert_eq!(x.first_column(), Err(Error::EmptyMatrix));
        let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(7);
        assert_eq!(x.random_column(&mut rng), Err(Error::EmptyMatrix));
    }

    #[test]
    fn new_rejects_duplicate_labels() {
        let err = SparseMatrix::new([("r0", true), ("r1", true), ("r0", false)]).unwrap_err();
        assert_eq!(
            err,
            Error::Construction(ConstructionError::DuplicateColumn { index: 2 })
        );
    }

    #[test]
    fn add_row_validates_indices() {
        let mut x = SparseMatrix::new(['a', 'b', 'c'].map(|c| (c, true))).unwrap();
        assert_eq!(x.add_row(&[]), Err(RowError::Empty.into()));
        assert_eq!(
            x.add_row(&[0, 3]),
            Err(RowError::OutOfRange {
                index: 3,
                columns: 3
            }
            .into())
        );
        assert_eq!(
            x.add_row(&[1, 0]),
            Err(RowError::NotAscending { position: 1 }.into())
        );
        assert_eq!(
            x.add_row(&[0, 2, 2]),
            Err(RowError::NotAscending { position: 2 }.into())
        );
        // rejected rows leave no trace
        assert_eq!(x.row_count(), 0);
        assert_eq!(x.v_links.len(), 4);
        assert_eq!(x.add_row(&[0, 2]), Ok(0));
        assert_eq!(x.add_row(&[1]), Ok(1));
    }

    #[test]
    fn add_row_after_seal_fails() {
        let mut x = knuth_example();
        x.seal();
        assert!(x.is_sealed());
        assert_eq!(x.add_row(&[0]), Err(Error::InvalidState));
        assert_eq!(x.row_count(), 6);
    }

    #[test]
    fn add_row_appends_to_column_tails() {
        let x = knuth_example();
        assert_eq!(sizes(&x), [2, 2, 2, 3, 2, 2, 3]);
        assert_eq!(column_rows(&x, 3), [1, 3, 5]);
        assert_eq!(column_rows(&x, 6), [1, 4, 5]);
        assert_eq!(x.row_columns(2).collect::<Vec<_>>(), [1, 2, 5]);
        assert_eq!(x.row_columns(4).collect::<Vec<_>>(), [1, 6]);
        // each row is a closed ring in both directions
        for row in 0..x.row_count() {
            let head = x.row_heads[row];
            let len = x.row_columns(row).count();
            assert_eq!(count_items_forward(&x.h_links, head) + 1, len);
            assert_eq!(count_items_backward(&x.h_links, head) + 1, len);
        }
    }

    fn assert_ring_symmetric(links: &[DoubleIndexLink], head: usize) {
        let mut node = head;
        loop {
            let DoubleIndexLink { prev, next } = links[node];
            assert_eq!(links[next].prev, node, "{node}.next.prev");
            assert_eq!(links[prev].next, node, "{node}.prev.next");
            node = next;
            if node == head {
                break;
            }
        }
    }

    #[test]
    fn links_are_symmetric() {
        let mut x = knuth_example();
        x.cover(0);
        x.cover(3);
        assert_ring_symmetric(&x.h_links, ROOT);
        for column in 0..x.column_count() {
            assert_ring_symmetric(&x.v_links, column + 1);
        }
        for &head in &x.row_heads {
            assert_ring_symmetric(&x.h_links, head);
        }
    }

    #[test]
    fn cover_hides_rows_of_column() {
        let mut x = knuth_example();
        x.cover(0);
        assert_eq!(x.active_columns().collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(sizes(&x), [2, 2, 2, 1, 2, 1, 2]);
        assert_eq!(column_rows(&x, 3), [5]);
        assert_eq!(column_rows(&x, 5), [2]);
        assert_eq!(x.removed_rows(), 2);
        // the covered column keeps its own ring
        assert_eq!(column_rows(&x, 0), [1, 3]);

        x.cover(3);
        assert_eq!(x.active_columns().collect::<Vec<_>>(), [1, 2, 4, 5, 6]);
        assert_eq!(sizes(&x), [2, 2, 2, 1, 1, 1, 1]);
        assert_eq!(x.removed_rows(), 3);

        x.uncover(3);
        x.uncover(0);
        assert_eq!(sizes(&x), [2, 2, 2, 3, 2, 2, 3]);
        assert_eq!(x.removed_rows(), 0);
    }

    #[test]
    fn cover_uncover_round_trip() {
        let pristine = knuth_example();
        let mut x = pristine.clone();
        for column in 0..x.column_count() {
            x.cover(column);
            x.uncover(column);
            assert_eq!(x.h_links, pristine.h_links, "h_links after column {column}");
            assert_eq!(x.v_links, pristine.v_links, "v_links after column {column}");
            assert_eq!(sizes(&x), sizes(&pristine));
        }

        // nested covers unwind in stack order
        x.cover(6);
        x.cover_row_others(x.first_in_column(6).unwrap());
        let mid_h = x.h_links.clone();
        let mid_v = x.v_links.clone();
        x.cover(1);
        x.uncover(1);
        assert_eq!(x.h_links, mid_h);
        assert_eq!(x.v_links, mid_v);
        x.uncover_row_others(x.first_in_column(6).unwrap());
        x.uncover(6);
        assert_eq!(x.h_links, pristine.h_links);
        assert_eq!(x.v_links, pristine.v_links);
    }

    #[test]
    fn secondary_columns_cover_without_touching_ring() {
        let mut x = SparseMatrix::new([('p', true), ('q', true), ('s', false)]).unwrap();
        x.add_row(&[0, 2]).unwrap();
        x.add_row(&[1, 2]).unwrap();
        x.add_row(&[1]).unwrap();
        let ring = x.active_columns().collect::<Vec<_>>();
        x.cover(2);
        assert_eq!(x.active_columns().collect::<Vec<_>>(), ring);
        assert_eq!(sizes(&x), [0, 1, 2]);
        x.uncover(2);
        assert_eq!(sizes(&x), [1, 2, 2]);
    }

    #[test]
    fn min_column_breaks_ties_by_priority() {
        let x = knuth_example();
        // columns a, b, c, e and f all have two entries
        assert_eq!(x.min_column(|_| ()), Ok(0));
        assert_eq!(x.min_column(|c| usize::from(c != 4)), Ok(4));
        assert_eq!(x.min_column(|c| std::cmp::Reverse(c)), Ok(5));
        // size always wins over priority
        assert_eq!(x.min_column(|c| usize::from(c != 3)), Ok(0));
    }

    #[test]
    fn first_column_follows_ring() {
        let mut x = knuth_example();
        assert_eq!(x.first_column(), Ok(0));
        x.cover(0);
        assert_eq!(x.first_column(), Ok(1));
    }

    #[test]
    fn random_column_is_uniform() {
        let mut x = knuth_example();
        x.cover(0);
        x.cover(3);
        x.cover(6);
        let active: Vec<_> = x.active_columns().collect();
        assert_eq!(active, [1, 2, 4, 5]);

        let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(1337);
        let draws = 40_000;
        let mut counts = [0usize; 7];
        for _ in 0..draws {
            counts[x.random_column(&mut rng).unwrap()] += 1;
        }
        for column in [0, 3, 6] {
            assert_eq!(counts[column], 0);
        }
        for &column in &active {
            let frequency = counts[column] as f64 / f64::from(draws);
            assert!(
                (frequency - 0.25).abs() < 0.015,
                "column {column} drawn with frequency {frequency}"
            );
        }
    }
}
