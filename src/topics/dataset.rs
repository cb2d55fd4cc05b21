//! In-memory sortable collection of rows for one topic.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::errors::{Result, SquadError};
use crate::topics::projection::ColumnSpec;
use crate::topics::row::Row;

/// Sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub column: usize,
    pub ascending: bool,
}

impl SortState {
    #[must_use]
    pub const fn ascending(column: usize) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    #[must_use]
    pub const fn descending(column: usize) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// Rows plus a validated sort state. Ordering is recomputed locally; nothing
/// here ever fetches.
#[derive(Debug, Clone)]
pub struct SortableDataset {
    columns: &'static [ColumnSpec],
    rows: Vec<Row>,
    sort: SortState,
    order: Vec<usize>,
}

impl SortableDataset {
    /// Empty dataset. Fails when `sort` does not name a column.
    pub fn new(columns: &'static [ColumnSpec], sort: SortState) -> Result<Self> {
        check_column(columns, sort.column)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
            sort,
            order: Vec::new(),
        })
    }

    /// Swap in a fresh batch of rows, keeping the current sort.
    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.reorder();
    }

    /// Select the sort column and direction.
    pub fn set_sort(&mut self, column: usize, ascending: bool) -> Result<()> {
        check_column(self.columns, column)?;
        self.sort = SortState { column, ascending };
        self.reorder();
        Ok(())
    }

    /// Select the sort column by its key.
    pub fn set_sort_by_key(&mut self, key: &str, ascending: bool) -> Result<()> {
        let column = self
            .columns
            .iter()
            .position(|spec| spec.key == key)
            .ok_or_else(|| SquadError::InvalidSortColumn {
                column: key.to_string(),
            })?;
        self.set_sort(column, ascending)
    }

    /// Move to the next (or previous) column, wrapping, keeping the direction.
    pub fn cycle_sort(&mut self, forward: bool) {
        let len = self.columns.len();
        let column = if forward {
            (self.sort.column + 1) % len
        } else {
            (self.sort.column + len - 1) % len
        };
        self.sort.column = column;
        self.reorder();
    }

    /// Flip the sort direction.
    pub fn reverse(&mut self) {
        self.sort.ascending = !self.sort.ascending;
        self.reorder();
    }

    #[must_use]
    pub const fn sort_state(&self) -> SortState {
        self.sort
    }

    #[must_use]
    pub fn sort_column(&self) -> &ColumnSpec {
        &self.columns[self.sort.column]
    }

    #[must_use]
    pub const fn columns(&self) -> &'static [ColumnSpec] {
        self.columns
    }

    /// Rows in their original (fetch) order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows in display order.
    #[must_use]
    pub fn ordered_rows(&self) -> Vec<Row> {
        self.order.iter().map(|&index| self.rows[index].clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn reorder(&mut self) {
        let key = self.columns[self.sort.column].key;
        let ascending = self.sort.ascending;
        let rows = &self.rows;
        let mut order: Vec<usize> = (0..rows.len()).collect();
        // `sort_by` is stable, so equal keys keep fetch order in both directions.
        order.sort_by(|&a, &b| {
            let ordering = rows[a].get(key).compare(rows[b].get(key));
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        self.order = order;
    }
}

fn check_column(columns: &[ColumnSpec], column: usize) -> Result<()> {
    if column < columns.len() {
        Ok(())
    } else {
        Err(SquadError::InvalidSortColumn {
            column: column.to_string(),
        })
    }
}

/// Direction arrow for a header.
#[must_use]
pub const fn direction_glyph(ascending: bool) -> char {
    if ascending { '\u{25b2}' } else { '\u{25bc}' }
}
