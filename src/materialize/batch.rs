//! Batch Planner - Splits a table into bounded INSERT statements
//!
//! Batches are rendered one at a time as the iterator advances, so the
//! rendered text of the whole table never exists at once. Rendering batch
//! `i` has no side effects and always yields the same text.

use crate::materialize::encoder::encode;
use crate::table::TypedTable;
use itertools::Itertools;
use std::num::NonZeroUsize;
use std::ops::Range;

/// One contiguous slice of rows, rendered as a VALUES list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in the plan (0-based)
    pub index: usize,
    /// Source rows covered by this batch
    pub rows: Range<usize>,
    /// `(v1, ..., vn), (v1, ..., vn), ...` in row order
    pub values: String,
}

impl Batch {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn insert_statement(&self, target: &str) -> String {
        insert_statement(target, &self.values)
    }
}

pub fn insert_statement(target: &str, values: &str) -> String {
    format!("INSERT INTO {} VALUES {}", target, values)
}

/// Plan the batches of `table`; empty tables yield no batches
pub fn plan(table: &TypedTable, batch_size: NonZeroUsize) -> Batches<'_> {
    Batches {
        table,
        batch_size: batch_size.get(),
        next: 0,
    }
}

/// Lazy, finite sequence of batches over a table
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    table: &'a TypedTable,
    batch_size: usize,
    next: usize,
}

impl<'a> Batches<'a> {
    /// Number of batches in the whole plan
    pub fn batch_count(&self) -> usize {
        self.table.row_count().div_ceil(self.batch_size)
    }

    /// Render batch `index` directly
    pub fn batch(&self, index: usize) -> Option<Batch> {
        let start = index.checked_mul(self.batch_size)?;
        if start >= self.table.row_count() {
            return None;
        }
        let end = (start + self.batch_size).min(self.table.row_count());
        Some(Batch {
            index,
            rows: start..end,
            values: render_rows(self.table, start..end),
        })
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let batch = self.batch(self.next)?;
        self.next += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.batch_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Batches<'a> {}

fn render_rows(table: &TypedTable, rows: Range<usize>) -> String {
    rows.map(|row| {
        let literals = table
            .cells(row)
            .map(|(value, native)| encode(value, native))
            .join(", ");
        format!("({})", literals)
    })
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Column, NativeType};

    fn numbered(n: i64) -> TypedTable {
        TypedTable::new(vec![
            Column::new("n", NativeType::Integer, (0..n).map(CellValue::Integer).collect()),
            Column::new(
                "label",
                NativeType::Text,
                (0..n).map(|i| CellValue::Text(format!("row {}", i))).collect(),
            ),
        ])
        .unwrap()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_batch_counts_and_sizes() {
        for (rows, k) in [(0, 3), (1, 3), (3, 3), (7, 3), (9, 3), (10, 1), (5, 100)] {
            let table = numbered(rows);
            let batches: Vec<Batch> = plan(&table, size(k)).collect();
            let expected = (rows as usize).div_ceil(k);
            assert_eq!(batches.len(), expected, "rows={rows} k={k}");

            if let Some(last) = batches.last() {
                let tail = rows as usize % k;
                assert_eq!(last.row_count(), if tail == 0 { k } else { tail });
            }
            for batch in batches.iter().rev().skip(1) {
                assert_eq!(batch.row_count(), k);
            }
        }
    }

    #[test]
    fn test_concatenated_batches_preserve_row_order() {
        let table = numbered(11);
        let rows: Vec<usize> = plan(&table, size(4)).flat_map(|b| b.rows).collect();
        assert_eq!(rows, (0..11).collect::<Vec<_>>());

        let indexes: Vec<usize> = plan(&table, size(4)).map(|b| b.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_values_rendering() {
        let table = numbered(3);
        let batches: Vec<Batch> = plan(&table, size(2)).collect();
        assert_eq!(batches[0].values, "(0, 'row 0'), (1, 'row 1')");
        assert_eq!(batches[1].values, "(2, 'row 2')");
        assert_eq!(
            batches[1].insert_statement("catalog.bronze.t"),
            "INSERT INTO catalog.bronze.t VALUES (2, 'row 2')"
        );
    }

    #[test]
    fn test_batches_can_be_recomputed() {
        let table = numbered(5);
        let batches = plan(&table, size(2));
        assert_eq!(batches.batch(1), batches.batch(1));
        assert_eq!(batches.batch(2).unwrap().rows, 4..5);
        assert_eq!(batches.batch(3), None);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_empty_table_has_no_batches() {
        let table = TypedTable::new(vec![Column::new("n", NativeType::Integer, vec![])]).unwrap();
        assert_eq!(plan(&table, size(10)).count(), 0);
    }
}
