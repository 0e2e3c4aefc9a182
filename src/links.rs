//! Circular doubly linked lists stored as integer indices into a `Vec`.

/// The two neighbours of a node in one direction of the torus: left/right for
/// rows and the header ring, up/down for columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DoubleIndexLink {
    pub(crate) prev: usize,
    pub(crate) next: usize,
}

impl DoubleIndexLink {
    /// A node that forms a ring on its own.
    pub(crate) fn singleton(target: usize) -> Self {
        Self {
            prev: target,
            next: target,
        }
    }
}

pub(crate) trait DoubleIndexLinkedList {
    /// Unlinks `target` from its neighbours while leaving its own links
    /// untouched, so that [`restore_links`](Self::restore_links) can put it back.
    fn remove_links(&mut self, target: usize);
    fn restore_links(&mut self, target: usize);
    fn is_removed(&self, target: usize) -> bool;
    /// Links `target` in just before `head`, i.e. at the tail of the ring.
    fn insert_before(&mut self, head: usize, target: usize);
}

impl<T> DoubleIndexLinkedList for T
where
    T: core::ops::IndexMut<usize, Output = DoubleIndexLink>,
{
    fn remove_links(&mut self, target: usize) {
        let DoubleIndexLink { prev, next } = self[target];
        self[prev].next = next;
        self[next].prev = prev;
    }

    fn restore_links(&mut self, target: usize) {
        let DoubleIndexLink { prev, next } = self[target];
        self[prev].next = target;
        self[next].prev = target;
    }

    fn is_removed(&self, target: usize) -> bool {
        let DoubleIndexLink { prev, next } = self[target];
        !(self[prev].next == target && self[next].prev == target)
    }

    fn insert_before(&mut self, head: usize, target: usize) {
        let tail = self[head].prev;
        self[target] = DoubleIndexLink {
            prev: tail,
            next: head,
        };
        self[tail].next = target;
        self[head].prev = target;
    }
}

/// Walks a ring forward from the node after `head` up to (excluding) `head`.
pub(crate) struct LinkIterator<'a> {
    list: &'a [DoubleIndexLink],
    head: usize,
    cursor: usize,
}

impl<'a> Iterator for LinkIterator<'a> {
    type Item = usize;
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.cursor).filter(|&c| c != self.head).map(|c| {
            self.cursor = self.list[c].next;
            c
        })
    }
}

impl<'a> LinkIterator<'a> {
    pub(crate) fn from_slice(slice: &'a [DoubleIndexLink], head: usize) -> Self {
        Self {
            list: slice,
            head,
            cursor: slice[head].next,
        }
    }
}
