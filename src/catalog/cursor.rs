//! Allocation-free cursors over catalog tables.
//!
//! Every step computes the next element's position arithmetically from a
//! table-relative offset; nothing is materialized up front.

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use super::codec::{bytes_at, read_i32, read_optional_offset, read_u8};
use super::format::TableKind;
use super::layout::{directory_slot, COUNT_SIZE};
use super::markup::MarkupTokenKind;
use super::model::{Api, MarkupTokenView};
use super::reader::ApiCatalog;

/// Iterator over the rows of a directory table.
pub struct TableIter<'a, T> {
    catalog: &'a ApiCatalog,
    table: TableKind,
    count: usize,
    front: usize,
    back: usize,
    make: fn(&'a ApiCatalog, usize) -> T,
}

impl<'a, T> TableIter<'a, T> {
    pub(crate) fn new(
        catalog: &'a ApiCatalog,
        table: TableKind,
        make: fn(&'a ApiCatalog, usize) -> T,
    ) -> Self {
        let data = catalog.table(table);
        let count = if data.is_empty() {
            0
        } else {
            read_i32(data, 0).max(0) as usize
        };
        Self {
            catalog,
            table,
            count,
            front: 0,
            back: count,
            make,
        }
    }

    /// Row `index` of the directory. Panics when past the row count.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        if index >= self.count {
            panic!(
                "index {} out of range for {} table with {} rows",
                index, self.table, self.count
            );
        }
        self.row(index)
    }

    fn row(&self, index: usize) -> T {
        let data = self.catalog.table(self.table);
        let offset = read_i32(data, directory_slot(index)) as usize;
        (self.make)(self.catalog, offset)
    }
}

impl<T> Iterator for TableIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        let item = self.row(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for TableIter<'_, T> {
    fn next_back(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.row(self.back))
    }
}

impl<T> ExactSizeIterator for TableIter<'_, T> {}
impl<T> FusedIterator for TableIter<'_, T> {}

/// Iterator over a length-prefixed array field of a row.
///
/// `read` receives the owning row's offset and the element position, both
/// relative to `table`.
pub struct ArrayIter<'a, T> {
    catalog: &'a ApiCatalog,
    table: TableKind,
    owner: usize,
    start: usize,
    element_size: usize,
    len: usize,
    front: usize,
    back: usize,
    read: fn(&'a ApiCatalog, usize, usize) -> T,
}

impl<'a, T> ArrayIter<'a, T> {
    /// Cursor over the array whose offset is stored at `field` in `table`.
    pub(crate) fn new(
        catalog: &'a ApiCatalog,
        table: TableKind,
        owner: usize,
        field: usize,
        element_size: usize,
        read: fn(&'a ApiCatalog, usize, usize) -> T,
    ) -> Self {
        let data = catalog.table(table);
        let array = read_i32(data, field) as usize;
        let len = read_i32(data, array).max(0) as usize;
        Self {
            catalog,
            table,
            owner,
            start: array + COUNT_SIZE,
            element_size,
            len,
            front: 0,
            back: len,
            read,
        }
    }

    /// Cursor over every row of a sorted table.
    pub(crate) fn rows(
        catalog: &'a ApiCatalog,
        table: TableKind,
        row_size: usize,
        read: fn(&'a ApiCatalog, usize, usize) -> T,
    ) -> Self {
        let len = SortedTable::new(catalog.table(table), row_size).count();
        Self {
            catalog,
            table,
            owner: 0,
            start: COUNT_SIZE,
            element_size: row_size,
            len,
            front: 0,
            back: len,
            read,
        }
    }

    /// Element `index` of the whole array. Panics when past the length.
    #[track_caller]
    pub fn get(&self, index: usize) -> T {
        if index >= self.len {
            panic!(
                "index {} out of range for array of length {} in {} table",
                index, self.len, self.table
            );
        }
        self.element(index)
    }

    /// Element of an array sorted by `cmp`, found by bisection.
    pub(crate) fn find_sorted<F>(&self, cmp: F) -> Option<T>
    where
        F: Fn(&T) -> Ordering,
    {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let element = self.element(mid);
            match cmp(&element) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(element),
            }
        }
        None
    }

    fn element(&self, index: usize) -> T {
        (self.read)(
            self.catalog,
            self.owner,
            self.start + index * self.element_size,
        )
    }
}

impl<T> Iterator for ArrayIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        let item = self.element(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for ArrayIter<'_, T> {
    fn next_back(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.element(self.back))
    }
}

impl<T> ExactSizeIterator for ArrayIter<'_, T> {}
impl<T> FusedIterator for ArrayIter<'_, T> {}

/// Rows of a sorted table.
#[derive(Clone, Copy)]
pub(crate) struct SortedTable<'a> {
    pub data: &'a [u8],
    pub row_size: usize,
}

impl<'a> SortedTable<'a> {
    pub fn new(data: &'a [u8], row_size: usize) -> Self {
        Self { data, row_size }
    }

    pub fn count(&self) -> usize {
        if self.data.is_empty() {
            0
        } else {
            read_i32(self.data, 0).max(0) as usize
        }
    }

    pub fn row(&self, index: usize) -> usize {
        COUNT_SIZE + index * self.row_size
    }

    /// Index of the first row for which `cmp` is `Equal`.
    ///
    /// Binary search lands on any row of a duplicate-key run, so the hit is
    /// walked back to the start of the run.
    pub fn first_match<F>(&self, cmp: F) -> Option<usize>
    where
        F: Fn(usize) -> Ordering,
    {
        let (mut lo, mut hi) = (0, self.count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match cmp(self.row(mid)) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => {
                    let mut first = mid;
                    while first > 0 && cmp(self.row(first - 1)) == Ordering::Equal {
                        first -= 1;
                    }
                    return Some(first);
                }
            }
        }
        None
    }
}

/// The run of consecutive sorted rows sharing a key with the first row.
pub struct SortedRun<'a, T> {
    catalog: &'a ApiCatalog,
    table: TableKind,
    row_size: usize,
    key_offset: usize,
    key_len: usize,
    first: Option<usize>,
    index: usize,
    make: fn(&'a ApiCatalog, usize) -> T,
}

impl<'a, T> SortedRun<'a, T> {
    /// Run starting at row `first`; the key is `key_len` bytes at
    /// `key_offset` within each row.
    pub(crate) fn new(
        catalog: &'a ApiCatalog,
        table: TableKind,
        row_size: usize,
        key_offset: usize,
        key_len: usize,
        first: Option<usize>,
        make: fn(&'a ApiCatalog, usize) -> T,
    ) -> Self {
        Self {
            catalog,
            table,
            row_size,
            key_offset,
            key_len,
            first,
            index: first.unwrap_or(0),
            make,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

impl<T> Iterator for SortedRun<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let first = self.first?;
        let table = SortedTable::new(self.catalog.table(self.table), self.row_size);
        if self.index >= table.count() {
            return None;
        }
        let key = bytes_at(table.data, table.row(first) + self.key_offset, self.key_len);
        let row = table.row(self.index);
        if bytes_at(table.data, row + self.key_offset, self.key_len) != key {
            return None;
        }
        self.index += 1;
        Some((self.make)(self.catalog, row))
    }
}

/// Parent chain of an API, nearest first.
pub struct Ancestors<'a> {
    catalog: &'a ApiCatalog,
    next: Option<usize>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(catalog: &'a ApiCatalog, start: Option<usize>) -> Self {
        Self {
            catalog,
            next: start,
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Api<'a>;

    fn next(&mut self) -> Option<Api<'a>> {
        let offset = self.next?;
        let api = Api::at(self.catalog, offset);
        self.next = api.parent().map(|p| p.offset());
        Some(api)
    }
}

impl FusedIterator for Ancestors<'_> {}

/// Pre-order walk of an API subtree.
pub struct Descendants<'a> {
    catalog: &'a ApiCatalog,
    stack: Vec<usize>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(catalog: &'a ApiCatalog, roots: Vec<usize>) -> Self {
        let mut stack = roots;
        stack.reverse();
        Self { catalog, stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Api<'a>;

    fn next(&mut self) -> Option<Api<'a>> {
        let offset = self.stack.pop()?;
        let api = Api::at(self.catalog, offset);
        let children = api.children();
        let mark = self.stack.len();
        self.stack.extend(children.map(|c| c.offset()));
        self.stack[mark..].reverse();
        Some(api)
    }
}

impl FusedIterator for Descendants<'_> {}

/// Tokens of a markup entry in the string heap.
///
/// Tokens are variable-width (reference tokens carry an extra API offset),
/// so this cursor only moves forward.
pub struct MarkupTokens<'a> {
    catalog: &'a ApiCatalog,
    position: usize,
    remaining: usize,
}

impl<'a> MarkupTokens<'a> {
    pub(crate) fn new(catalog: &'a ApiCatalog, offset: usize) -> Self {
        let heap = catalog.heap();
        let remaining = read_i32(heap, offset).max(0) as usize;
        Self {
            catalog,
            position: offset + COUNT_SIZE,
            remaining,
        }
    }
}

impl<'a> Iterator for MarkupTokens<'a> {
    type Item = MarkupTokenView<'a>;

    fn next(&mut self) -> Option<MarkupTokenView<'a>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let heap = self.catalog.heap();
        let raw_kind = read_u8(heap, self.position);
        let kind = match MarkupTokenKind::from_u8(raw_kind) {
            Some(kind) => kind,
            None => panic!(
                "invalid markup token kind {} at heap offset {}",
                raw_kind, self.position
            ),
        };
        let text = read_i32(heap, self.position + 1) as usize;
        self.position += 5;

        let reference = if kind == MarkupTokenKind::Reference {
            let target = read_optional_offset(heap, self.position);
            self.position += 4;
            target.map(|offset| Api::at(self.catalog, offset))
        } else {
            None
        };

        Some(MarkupTokenView::new(
            kind,
            self.catalog.string_at(text),
            reference,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MarkupTokens<'_> {}

impl<T> fmt::Debug for ArrayIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayIter")
            .field("table", &self.table)
            .field("len", &self.len)
            .field("front", &self.front)
            .finish()
    }
}
